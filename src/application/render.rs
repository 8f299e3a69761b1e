//! Render dispatch.
//!
//! Renderers are registered per template language and device class.
//! Rendering writes into a bounded in-memory buffer; on failure the
//! partial output is discarded with the buffer, so a half-rendered body
//! can never reach the response. The finished buffer is flushed exactly
//! once as `(bytes, content_length)`.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::{DeviceType, TemplateLanguage, ThemeTemplate};

use super::error::RenderError;
use super::model::Model;

/// Initial buffer allocation; grows as needed up to the configured ceiling.
const INITIAL_CAPACITY: usize = 4 * 1024;

#[derive(Debug, Error)]
pub enum RenderFailure {
    #[error("rendered output exceeded the {ceiling}-byte ceiling")]
    OutputOverflow { ceiling: usize },
    #[error("template `{template}` failed: {message}")]
    Template { template: String, message: String },
}

/// Bounded output buffer owned by a single render call.
pub struct RenderedOutput {
    buf: Vec<u8>,
    ceiling: usize,
}

impl RenderedOutput {
    pub fn new(ceiling: usize) -> Self {
        Self {
            buf: Vec::with_capacity(INITIAL_CAPACITY.min(ceiling)),
            ceiling,
        }
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), RenderFailure> {
        if self.buf.len() + bytes.len() > self.ceiling {
            return Err(RenderFailure::OutputOverflow {
                ceiling: self.ceiling,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Single flush: consumes the buffer and hands the bytes plus their
    /// length to the boundary in one step.
    pub fn flush(self) -> RenderedPage {
        let bytes = Bytes::from(self.buf);
        RenderedPage {
            content_length: bytes.len(),
            bytes,
        }
    }
}

/// Byte output of one render call.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub bytes: Bytes,
    pub content_length: usize,
}

pub trait Renderer: Send + Sync {
    fn render(
        &self,
        template: &ThemeTemplate,
        model: &Model,
        out: &mut RenderedOutput,
    ) -> Result<(), RenderFailure>;
}

/// Emits template contents verbatim.
pub struct StaticRenderer;

impl Renderer for StaticRenderer {
    fn render(
        &self,
        template: &ThemeTemplate,
        _model: &Model,
        out: &mut RenderedOutput,
    ) -> Result<(), RenderFailure> {
        out.write(template.contents.as_bytes())
    }
}

/// Substitutes `{{name}}` markers from the model.
///
/// Dotted names traverse into model objects (`{{weblog.name}}`). Unknown
/// names render as empty strings; an unterminated marker fails the render.
pub struct PlaceholderRenderer;

impl Renderer for PlaceholderRenderer {
    fn render(
        &self,
        template: &ThemeTemplate,
        model: &Model,
        out: &mut RenderedOutput,
    ) -> Result<(), RenderFailure> {
        let mut rest = template.contents.as_str();
        while let Some(start) = rest.find("{{") {
            out.write(rest[..start].as_bytes())?;
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(RenderFailure::Template {
                    template: template.id.clone(),
                    message: "unterminated `{{` marker".to_string(),
                });
            };
            let name = after[..end].trim();
            match lookup(model, name) {
                Some(value) => out.write(value.as_bytes())?,
                None => {
                    debug!(
                        target = "application::render",
                        template = %template.id,
                        name,
                        "placeholder has no model value"
                    );
                }
            }
            rest = &after[end + 2..];
        }
        out.write(rest.as_bytes())
    }
}

fn lookup(model: &Model, name: &str) -> Option<String> {
    let mut segments = name.split('.');
    let mut value = model.get(segments.next()?)?;
    for segment in segments {
        value = value.get(segment)?;
    }
    Some(match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Renderer selection, keyed by template language and device class.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: HashMap<(TemplateLanguage, DeviceType), Arc<dyn Renderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in renderers wired for both device classes.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let placeholder: Arc<dyn Renderer> = Arc::new(PlaceholderRenderer);
        let fixed: Arc<dyn Renderer> = Arc::new(StaticRenderer);
        for device in [DeviceType::Standard, DeviceType::Mobile] {
            registry.register(TemplateLanguage::Placeholder, device, placeholder.clone());
            registry.register(TemplateLanguage::Static, device, fixed.clone());
        }
        registry
    }

    pub fn register(
        &mut self,
        language: TemplateLanguage,
        device: DeviceType,
        renderer: Arc<dyn Renderer>,
    ) {
        self.renderers.insert((language, device), renderer);
    }

    pub fn select(
        &self,
        template: &ThemeTemplate,
        device: DeviceType,
    ) -> Result<Arc<dyn Renderer>, RenderError> {
        self.renderers
            .get(&(template.language, device))
            .cloned()
            .ok_or(RenderError::RendererNotFound {
                language: template.language,
                device,
            })
    }
}

/// Execute a renderer against a model into a fresh bounded buffer.
///
/// Partial output is dropped with the buffer on failure.
pub fn render_content(
    renderer: &dyn Renderer,
    template: &ThemeTemplate,
    model: &Model,
    ceiling: usize,
) -> Result<RenderedPage, RenderError> {
    let mut out = RenderedOutput::new(ceiling);
    renderer
        .render(template, model, &mut out)
        .map_err(RenderError::RenderFailed)?;
    Ok(out.flush())
}
