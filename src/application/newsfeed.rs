//! Memoizing newsfeed service.
//!
//! Composes the remote fetcher with an injected [`ExpiringCache`]: fetch
//! and cache are always two separate steps, so the cache lock is never
//! held across the network await. A failed fetch may be cached as a
//! negative sentinel to keep a failing upstream from being hammered for
//! the length of the TTL.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use crate::cache::ExpiringCache;
use crate::infra::fetch::{FetchError, NewsfeedFetcher};
use crate::infra::feed::NewsfeedDocument;

use super::model::{Model, ModelError, ModelLoader, ModelSeed};

const SOURCE: &str = "application::newsfeed";

/// Cache payload: a parsed document or the memory of a failed fetch.
#[derive(Clone)]
pub enum FeedEntry {
    Document(Arc<NewsfeedDocument>),
    Failed,
}

#[derive(Debug, Error)]
pub enum NewsfeedError {
    #[error("feed fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("feed is negatively cached after a recent failure")]
    Unavailable,
}

pub struct NewsfeedService {
    fetcher: NewsfeedFetcher,
    cache: Arc<ExpiringCache<String, FeedEntry>>,
    cache_failures: bool,
}

impl NewsfeedService {
    pub fn new(
        fetcher: NewsfeedFetcher,
        cache: Arc<ExpiringCache<String, FeedEntry>>,
        cache_failures: bool,
    ) -> Self {
        Self {
            fetcher,
            cache,
            cache_failures,
        }
    }

    /// Return the parsed feed for `url`, fetching on a cache miss.
    ///
    /// Concurrent misses for one URL fetch redundantly; the cache converges
    /// to a single entry shortly after.
    pub async fn feed(&self, url: &str) -> Result<Arc<NewsfeedDocument>, NewsfeedError> {
        match self.cache.get(url) {
            Some(FeedEntry::Document(doc)) => return Ok(doc),
            Some(FeedEntry::Failed) => return Err(NewsfeedError::Unavailable),
            None => {}
        }

        counter!("brezza_newsfeed_fetch_total").increment(1);
        match self.fetcher.fetch(url).await {
            Ok(doc) => {
                let doc = Arc::new(doc);
                self.cache
                    .put(url.to_string(), FeedEntry::Document(doc.clone()));
                Ok(doc)
            }
            Err(err) => {
                counter!("brezza_newsfeed_fetch_failed_total").increment(1);
                warn!(target = SOURCE, url, error = %err, "newsfeed fetch failed");
                if self.cache_failures {
                    self.cache.put(url.to_string(), FeedEntry::Failed);
                }
                Err(NewsfeedError::Fetch(err))
            }
        }
    }
}

/// Exposes a remote newsfeed to templates under `newsfeed`.
///
/// The feed URL comes from the request context (`newsfeedUrl`), falling
/// back to the configured default. A failed or absent feed leaves the
/// model untouched; feed problems never fail a page render.
pub struct NewsfeedModel {
    service: Arc<NewsfeedService>,
    default_url: Option<String>,
}

impl NewsfeedModel {
    pub fn new(service: Arc<NewsfeedService>, default_url: Option<String>) -> Self {
        Self {
            service,
            default_url,
        }
    }
}

#[async_trait]
impl ModelLoader for NewsfeedModel {
    fn name(&self) -> &'static str {
        "newsfeed"
    }

    async fn populate(&self, seed: &ModelSeed, model: &mut Model) -> Result<(), ModelError> {
        let url = seed
            .request
            .context
            .get("newsfeedUrl")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.default_url.clone());
        let Some(url) = url else {
            return Ok(());
        };

        match self.service.feed(&url).await {
            Ok(doc) => {
                let items: Vec<Value> = doc
                    .items
                    .iter()
                    .map(|item| {
                        json!({
                            "title": item.title,
                            "link": item.link,
                            "summary": item.summary,
                        })
                    })
                    .collect();
                model.insert(
                    "newsfeed".to_string(),
                    json!({
                        "title": doc.title,
                        "link": doc.link,
                        "items": items,
                    }),
                );
            }
            Err(err) => {
                warn!(
                    target = SOURCE,
                    url,
                    error = %err,
                    "rendering without newsfeed model"
                );
            }
        }
        Ok(())
    }
}
