//! Render request construction.
//!
//! A [`RenderRequest`] aggregates everything the pipeline needs to produce
//! one page: weblog handle, category filter, locale, device class, an
//! optional search term and caller-supplied context objects for the model.
//! It is immutable once built except for the forced-locale adjustment
//! applied after the weblog resolves.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{DeviceType, Weblog};

use super::error::RenderError;

/// Query parameters accepted at the rendering boundary.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Category filter.
    pub cat: Option<String>,
    pub locale: Option<String>,
    /// Explicit device override for previews: `standard` or `mobile`.
    #[serde(rename = "type")]
    pub device: Option<String>,
    /// Search term, search dispatch only.
    pub q: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub weblog_handle: String,
    pub category: Option<String>,
    pub locale: Option<String>,
    pub device: DeviceType,
    pub query: Option<String>,
    /// Opaque context objects passed through to model loaders.
    pub context: HashMap<String, Value>,
}

impl RenderRequest {
    /// Build a request from boundary inputs.
    ///
    /// The device class is taken from the explicit `type` parameter when
    /// present, otherwise classified from the user agent.
    pub fn new(
        handle: &str,
        params: RenderParams,
        user_agent: Option<&str>,
    ) -> Result<Self, RenderError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(RenderError::request_invalid("empty weblog handle"));
        }

        let device = match params.device.as_deref() {
            Some(param) => DeviceType::from_param(param),
            None => DeviceType::classify(user_agent),
        };

        Ok(Self {
            weblog_handle: handle.to_string(),
            category: params.cat,
            locale: params.locale,
            device,
            query: params.q,
            context: HashMap::new(),
        })
    }

    /// Attach a caller-supplied context object for the model loaders.
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Force the weblog's own locale when the request carries none and the
    /// weblog does not show all languages.
    pub(crate) fn force_locale(&mut self, weblog: &Weblog) {
        if self.locale.is_none() && !weblog.show_all_langs {
            self.locale = Some(weblog.locale.clone());
        }
    }
}
