use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::{DeviceType, TemplateLanguage};

use super::model::ModelError;
use super::render::RenderFailure;

/// Request-scoped failures of the render pipeline.
///
/// Every variant maps to an HTTP-style status; the underlying cause is
/// logged at the dispatch boundary and never shown to the caller.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid request: {0}")]
    RequestInvalid(String),
    #[error("theme `{theme}` has no usable template for weblog `{weblog}`")]
    NoTemplateAvailable { weblog: String, theme: String },
    #[error("no renderer registered for {language:?} templates on {device:?} devices")]
    RendererNotFound {
        language: TemplateLanguage,
        device: DeviceType,
    },
    #[error("template execution failed: {0}")]
    RenderFailed(#[source] RenderFailure),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl RenderError {
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::RequestInvalid(message.into())
    }

    /// Status handed to the response boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            RenderError::RequestInvalid(_) => StatusCode::BAD_REQUEST,
            // The theme is misconfigured; the request itself was fine.
            RenderError::NoTemplateAvailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RenderError::RendererNotFound { .. } => StatusCode::NOT_FOUND,
            RenderError::RenderFailed(_) => StatusCode::NOT_FOUND,
            RenderError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
