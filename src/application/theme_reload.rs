//! Development-mode theme reloading.
//!
//! Before a template resolves, a dev-mode deployment re-reads disk-backed
//! themes so edits show up without a restart. A reported change purges the
//! page cache whose content derives from the theme (site-wide cache for
//! the designated site-wide weblog, per-weblog cache otherwise) and
//! refreshes the locale message bundle. Everything here is best-effort: a
//! reload failure is logged and the request proceeds with the previously
//! loaded theme.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info};

use crate::cache::{ExpiringCache, PageKey};
use crate::domain::{MessageBundles, ThemeSource, Weblog};

const SOURCE: &str = "application::theme_reload";

pub struct ThemeReloadCoordinator {
    enabled: bool,
    themes: Arc<dyn ThemeSource>,
    bundles: Arc<dyn MessageBundles>,
    page_cache: Arc<ExpiringCache<PageKey, Bytes>>,
    site_cache: Arc<ExpiringCache<PageKey, Bytes>>,
    site_wide_handle: Option<String>,
}

impl ThemeReloadCoordinator {
    pub fn new(
        enabled: bool,
        themes: Arc<dyn ThemeSource>,
        bundles: Arc<dyn MessageBundles>,
        page_cache: Arc<ExpiringCache<PageKey, Bytes>>,
        site_cache: Arc<ExpiringCache<PageKey, Bytes>>,
        site_wide_handle: Option<String>,
    ) -> Self {
        Self {
            enabled,
            themes,
            bundles,
            page_cache,
            site_cache,
            site_wide_handle,
        }
    }

    /// Reload the weblog's theme if dev-mode reloading applies to it.
    pub async fn maybe_reload(&self, weblog: &Weblog) {
        if !self.enabled || !weblog.has_reloadable_theme() {
            return;
        }

        match self.themes.reload_from_disk(&weblog.editor_theme).await {
            Ok(true) => {
                if self.is_site_wide(&weblog.handle) {
                    self.site_cache.clear();
                } else {
                    self.page_cache.clear();
                }
                self.bundles.reload(&weblog.locale);
                info!(
                    target = SOURCE,
                    weblog = %weblog.handle,
                    theme = %weblog.editor_theme,
                    "theme changed on disk, purged derived caches"
                );
            }
            Ok(false) => {}
            Err(err) => {
                error!(
                    target = SOURCE,
                    weblog = %weblog.handle,
                    theme = %weblog.editor_theme,
                    error = %err,
                    "theme reload failed, continuing with loaded theme"
                );
            }
        }
    }

    fn is_site_wide(&self, handle: &str) -> bool {
        self.site_wide_handle.as_deref() == Some(handle)
    }
}
