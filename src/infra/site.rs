//! Disk-backed site definition.
//!
//! `DiskSite` loads weblogs, themes and locale message bundles from a site
//! directory and implements the collaborator contracts the pipeline
//! consumes:
//!
//! ```text
//! site/
//!   site.toml            weblog definitions
//!   themes/<name>.toml   theme + template definitions
//!   messages/<locale>.toml
//! ```
//!
//! Theme reloads re-read the theme file and report whether the stored
//! definition actually changed, which drives dev-mode cache purges.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::domain::{
    CUSTOM_THEME, ComponentType, DomainError, MessageBundles, TemplateLanguage, Theme, ThemeSource,
    ThemeTemplate, Weblog, WeblogRepo,
};

use super::error::InfraError;

const SOURCE: &str = "infra::site";

#[derive(Debug, Deserialize)]
struct SiteFile {
    #[serde(default)]
    weblogs: Vec<WeblogEntry>,
}

#[derive(Debug, Deserialize)]
struct WeblogEntry {
    handle: String,
    name: String,
    #[serde(default = "default_locale")]
    locale: String,
    #[serde(default = "default_true")]
    show_all_langs: bool,
    theme: String,
    #[serde(default)]
    newsfeed_url: Option<String>,
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ThemeFile {
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    templates: Vec<TemplateEntry>,
}

#[derive(Debug, Deserialize)]
struct TemplateEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    action: ComponentType,
    language: TemplateLanguage,
    contents: String,
}

pub struct DiskSite {
    root: PathBuf,
    weblogs: HashMap<String, Arc<Weblog>>,
    themes: RwLock<HashMap<String, Arc<Theme>>>,
    bundles: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl DiskSite {
    /// Load the site definition, including every referenced theme.
    pub async fn load(root: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let root = root.into();
        let site_path = root.join("site.toml");
        let raw = tokio::fs::read_to_string(&site_path).await?;
        let site: SiteFile = toml::from_str(&raw)
            .map_err(|err| InfraError::site(format!("{}: {err}", site_path.display())))?;

        let mut weblogs = HashMap::new();
        let mut themes = HashMap::new();
        for entry in site.weblogs {
            if entry.theme != CUSTOM_THEME && !themes.contains_key(&entry.theme) {
                let theme = read_theme(&root, &entry.theme).await?;
                themes.insert(entry.theme.clone(), Arc::new(theme));
            }
            weblogs.insert(
                entry.handle.clone(),
                Arc::new(Weblog {
                    handle: entry.handle,
                    name: entry.name,
                    locale: entry.locale,
                    show_all_langs: entry.show_all_langs,
                    editor_theme: entry.theme,
                    newsfeed_url: entry.newsfeed_url,
                }),
            );
        }

        debug!(
            target = SOURCE,
            weblogs = weblogs.len(),
            themes = themes.len(),
            "loaded site definition"
        );

        let site = Self {
            root,
            weblogs,
            themes: RwLock::new(themes),
            bundles: RwLock::new(HashMap::new()),
        };

        let mut seen = std::collections::HashSet::new();
        for weblog in site.weblogs.values() {
            if seen.insert(weblog.locale.clone()) {
                site.reload(&weblog.locale);
            }
        }

        Ok(site)
    }
}

async fn read_theme(root: &Path, name: &str) -> Result<Theme, InfraError> {
    let path = root.join("themes").join(format!("{name}.toml"));
    let raw = tokio::fs::read_to_string(&path).await?;
    let file: ThemeFile = toml::from_str(&raw)
        .map_err(|err| InfraError::site(format!("{}: {err}", path.display())))?;

    let modified = tokio::fs::metadata(&path)
        .await
        .ok()
        .and_then(|meta| meta.modified().ok())
        .map(OffsetDateTime::from)
        .unwrap_or_else(OffsetDateTime::now_utc);

    let templates = file
        .templates
        .into_iter()
        .map(|entry| ThemeTemplate {
            name: entry.name.unwrap_or_else(|| entry.id.clone()),
            id: entry.id,
            action: entry.action,
            language: entry.language,
            contents: entry.contents,
            last_modified: modified,
        })
        .collect();

    Ok(Theme::new(name, templates, file.default))
}

/// Structural comparison ignoring the file modification stamp, so merely
/// touching a theme file does not count as a change.
fn themes_differ(a: &Theme, b: &Theme) -> bool {
    let fingerprint = |theme: &Theme| {
        let mut parts: Vec<(String, ComponentType, TemplateLanguage, String)> = theme
            .templates()
            .iter()
            .map(|t| (t.id.clone(), t.action, t.language, t.contents.clone()))
            .collect();
        parts.sort_by(|a, b| a.0.cmp(&b.0));
        (
            parts,
            theme.default_template().map(|t| t.id.clone()),
        )
    };
    fingerprint(a) != fingerprint(b)
}

#[async_trait]
impl WeblogRepo for DiskSite {
    async fn resolve(&self, handle: &str) -> Option<Arc<Weblog>> {
        self.weblogs.get(handle).cloned()
    }
}

#[async_trait]
impl ThemeSource for DiskSite {
    fn theme(&self, name: &str) -> Option<Arc<Theme>> {
        self.themes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    async fn reload_from_disk(&self, name: &str) -> Result<bool, DomainError> {
        let reloaded = read_theme(&self.root, name)
            .await
            .map_err(|err| DomainError::theme_reload(name, err.to_string()))?;

        let mut themes = self
            .themes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let changed = themes
            .get(name)
            .is_none_or(|current| themes_differ(current, &reloaded));
        themes.insert(name.to_string(), Arc::new(reloaded));
        Ok(changed)
    }
}

impl MessageBundles for DiskSite {
    fn reload(&self, locale: &str) {
        let path = self.root.join("messages").join(format!("{locale}.toml"));
        let bundle: HashMap<String, String> = match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(bundle) => bundle,
                Err(err) => {
                    warn!(
                        target = SOURCE,
                        locale,
                        error = %err,
                        "message bundle is malformed, keeping previous bundle"
                    );
                    return;
                }
            },
            Err(err) => {
                // Absent bundles are normal; weblogs may not ship messages.
                debug!(target = SOURCE, locale, error = %err, "no message bundle on disk");
                return;
            }
        };

        self.bundles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(locale.to_string(), bundle);
    }

    fn messages(&self, locale: &str) -> HashMap<String, String> {
        self.bundles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(locale)
            .cloned()
            .unwrap_or_default()
    }
}
