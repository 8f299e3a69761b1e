//! Weblog entity and lookup.

use std::sync::Arc;

use async_trait::async_trait;

use super::themes::CUSTOM_THEME;

#[derive(Debug, Clone)]
pub struct Weblog {
    /// Stable handle used in URLs, unique per site.
    pub handle: String,
    pub name: String,
    /// Default locale of the weblog, e.g. `en-US`.
    pub locale: String,
    /// When false, requests without an explicit locale are forced to the
    /// weblog's own locale.
    pub show_all_langs: bool,
    /// Name of the active theme; [`CUSTOM_THEME`] marks hand-edited themes.
    pub editor_theme: String,
    /// Weblog-specific newsfeed URL, overriding the deployment default.
    pub newsfeed_url: Option<String>,
}

impl Weblog {
    /// Whether the active theme is disk-backed and therefore reloadable.
    pub fn has_reloadable_theme(&self) -> bool {
        self.editor_theme != CUSTOM_THEME
    }
}

/// Weblog lookup by handle.
#[async_trait]
pub trait WeblogRepo: Send + Sync {
    async fn resolve(&self, handle: &str) -> Option<Arc<Weblog>>;
}
