//! Template resolution.
//!
//! Picks the template for a component type from the weblog's active theme,
//! falling back to the theme default. Device type and locale are advisory
//! hints for the dispatcher and play no part in resolution.

use tracing::debug;

use crate::domain::{ComponentType, Theme, ThemeTemplate, Weblog};

use super::error::RenderError;

pub fn resolve<'a>(
    weblog: &Weblog,
    theme: &'a Theme,
    component: ComponentType,
) -> Result<&'a ThemeTemplate, RenderError> {
    if let Some(template) = theme.template_by_action(component) {
        return Ok(template);
    }

    debug!(
        target = "application::templates",
        weblog = %weblog.handle,
        component = component.as_str(),
        "no dedicated template, falling back to theme default"
    );

    theme
        .default_template()
        .ok_or_else(|| RenderError::NoTemplateAvailable {
            weblog: weblog.handle.clone(),
            theme: theme.name.clone(),
        })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::domain::TemplateLanguage;

    use super::*;

    fn weblog() -> Weblog {
        Weblog {
            handle: "demo".to_string(),
            name: "Demo".to_string(),
            locale: "en".to_string(),
            show_all_langs: true,
            editor_theme: "plain".to_string(),
            newsfeed_url: None,
        }
    }

    fn template(id: &str, action: ComponentType) -> ThemeTemplate {
        ThemeTemplate {
            id: id.to_string(),
            name: id.to_string(),
            action,
            language: TemplateLanguage::Placeholder,
            contents: String::new(),
            last_modified: datetime!(2026-01-01 00:00 UTC),
        }
    }

    #[test]
    fn dedicated_template_wins() {
        let theme = Theme::new(
            "plain",
            vec![
                template("main", ComponentType::Weblog),
                template("results", ComponentType::Search),
            ],
            Some("main".to_string()),
        );
        let resolved = resolve(&weblog(), &theme, ComponentType::Search).unwrap();
        assert_eq!(resolved.id, "results");
    }

    #[test]
    fn missing_component_falls_back_to_default() {
        let theme = Theme::new(
            "plain",
            vec![template("main", ComponentType::Weblog)],
            Some("main".to_string()),
        );
        let resolved = resolve(&weblog(), &theme, ComponentType::Search).unwrap();
        assert_eq!(resolved.id, "main");
    }

    #[test]
    fn no_template_at_all_is_an_error() {
        let theme = Theme::new("empty", Vec::new(), None);
        let err = resolve(&weblog(), &theme, ComponentType::Search).unwrap_err();
        assert!(matches!(err, RenderError::NoTemplateAvailable { .. }));
    }
}
