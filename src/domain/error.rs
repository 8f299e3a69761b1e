use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("theme `{theme}` could not be reloaded: {message}")]
    ThemeReload { theme: String, message: String },
}

impl DomainError {
    pub fn theme_reload(theme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ThemeReload {
            theme: theme.into(),
            message: message.into(),
        }
    }
}
