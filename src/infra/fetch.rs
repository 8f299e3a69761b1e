//! Remote newsfeed fetcher.
//!
//! Fetches a syndication feed over HTTP, resolves the response charset
//! from the `Content-Type` header (falling back to UTF-8 when the charset
//! is absent, malformed or unknown) and parses the decoded body into a
//! [`NewsfeedDocument`]. Every failure mode comes back as a typed
//! [`FetchError`]; nothing here panics across the call boundary, and the
//! fetcher never touches any cache.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::feed::{FeedParseError, NewsfeedDocument, parse_feed};

const SOURCE: &str = "infra::fetch";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid feed url `{url}`: {cause}")]
    InvalidUrl { url: String, cause: url::ParseError },
    #[error("feed transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Parse(#[from] FeedParseError),
}

pub struct NewsfeedFetcher {
    client: reqwest::Client,
}

impl NewsfeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Fetch and parse a feed. Blocking from the caller's point of view:
    /// the request runs to completion or to the configured timeout.
    pub async fn fetch(&self, url: &str) -> Result<NewsfeedDocument, FetchError> {
        let parsed_url = Url::parse(url).map_err(|cause| FetchError::InvalidUrl {
            url: url.to_string(),
            cause,
        })?;

        let response = self
            .client
            .get(parsed_url)
            .send()
            .await?
            .error_for_status()?;

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_param)
            .map(str::to_string);

        let body = response.bytes().await?;
        let encoding = resolve_encoding(charset.as_deref());
        debug!(
            target = SOURCE,
            url,
            encoding = encoding.name(),
            bytes = body.len(),
            "decoded feed body"
        );

        let (text, _, _) = encoding.decode(&body);
        Ok(parse_feed(&text)?)
    }
}

/// Extract the charset parameter from a `Content-Type` header value.
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

/// Map a charset label to an encoding, falling back to UTF-8 for absent,
/// empty or unknown labels.
fn resolve_encoding(label: Option<&str>) -> &'static Encoding {
    label
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}
