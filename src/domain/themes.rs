//! Themes and templates.
//!
//! A theme is a named collection of templates. Each template is addressed by
//! the component it renders (`ComponentType`); a theme may also designate a
//! default template that covers components without a dedicated one.

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;

use super::error::DomainError;

/// Name of the pseudo-theme for weblogs with hand-edited templates.
///
/// Custom themes live in the weblog's own storage and are never reloadable
/// from disk.
pub const CUSTOM_THEME: &str = "custom";

/// The kind of page a template produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Weblog,
    Permalink,
    Search,
    Feed,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Weblog => "weblog",
            ComponentType::Permalink => "permalink",
            ComponentType::Search => "search",
            ComponentType::Feed => "feed",
        }
    }
}

/// Authoring language of a template; renderers are registered per language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateLanguage {
    /// Template contents are emitted verbatim.
    Static,
    /// `{{name}}` markers are substituted from the model.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct ThemeTemplate {
    pub id: String,
    pub name: String,
    pub action: ComponentType,
    pub language: TemplateLanguage,
    pub contents: String,
    pub last_modified: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    templates: Vec<ThemeTemplate>,
    default_template: Option<String>,
}

impl Theme {
    pub fn new(
        name: impl Into<String>,
        templates: Vec<ThemeTemplate>,
        default_template: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            templates,
            default_template,
        }
    }

    /// Look up the template for a component type.
    pub fn template_by_action(&self, action: ComponentType) -> Option<&ThemeTemplate> {
        self.templates.iter().find(|t| t.action == action)
    }

    /// The theme's designated default template, if any.
    pub fn default_template(&self) -> Option<&ThemeTemplate> {
        let id = self.default_template.as_deref()?;
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn templates(&self) -> &[ThemeTemplate] {
        &self.templates
    }
}

/// Access to theme definitions, including development-mode reloads.
#[async_trait]
pub trait ThemeSource: Send + Sync {
    /// Resolve a theme by name.
    fn theme(&self, name: &str) -> Option<std::sync::Arc<Theme>>;

    /// Re-read a disk-backed theme definition.
    ///
    /// Returns `true` when the stored definition differed from the loaded
    /// one, signalling that theme-derived caches must be purged.
    async fn reload_from_disk(&self, name: &str) -> Result<bool, DomainError>;
}

/// Locale message bundles attached to rendered pages.
pub trait MessageBundles: Send + Sync {
    /// Refresh the bundle for a locale after a theme change. Best-effort.
    fn reload(&self, locale: &str);

    /// The full bundle for a locale; empty when none is loaded.
    fn messages(&self, locale: &str) -> std::collections::HashMap<String, String>;
}
