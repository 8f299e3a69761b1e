//! Rendering model population.
//!
//! The model is a flat map of named [`serde_json::Value`] objects consumed
//! by renderers. Loaders are registered by name; settings decide which
//! loader set applies to which content type, so deployments can extend the
//! model without touching the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;

use crate::domain::{MessageBundles, Weblog};

use super::request::RenderRequest;

pub type Model = HashMap<String, Value>;

/// Inputs every loader may draw from. Loaders read the seed and write the
/// model; they never mutate the seed.
pub struct ModelSeed {
    pub weblog: Arc<Weblog>,
    pub request: RenderRequest,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown model loader `{0}`")]
    UnknownLoader(String),
}

#[async_trait]
pub trait ModelLoader: Send + Sync {
    fn name(&self) -> &'static str;
    async fn populate(&self, seed: &ModelSeed, model: &mut Model) -> Result<(), ModelError>;
}

#[derive(Default)]
pub struct ModelLoaderRegistry {
    loaders: HashMap<&'static str, Arc<dyn ModelLoader>>,
}

impl ModelLoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, loader: Arc<dyn ModelLoader>) {
        self.loaders.insert(loader.name(), loader);
    }

    /// Run the named loaders in order against a shared model.
    pub async fn load_models(
        &self,
        names: &[String],
        seed: &ModelSeed,
        model: &mut Model,
    ) -> Result<(), ModelError> {
        for name in names {
            let loader = self
                .loaders
                .get(name.as_str())
                .ok_or_else(|| ModelError::UnknownLoader(name.clone()))?;
            loader.populate(seed, model).await?;
        }
        Ok(())
    }
}

/// Exposes the weblog identity to templates under `weblog`.
pub struct WeblogModel;

#[async_trait]
impl ModelLoader for WeblogModel {
    fn name(&self) -> &'static str {
        "weblog"
    }

    async fn populate(&self, seed: &ModelSeed, model: &mut Model) -> Result<(), ModelError> {
        model.insert(
            "weblog".to_string(),
            json!({
                "handle": seed.weblog.handle,
                "name": seed.weblog.name,
                "locale": seed.weblog.locale,
            }),
        );
        Ok(())
    }
}

/// Exposes request facts to templates under `request`.
pub struct RequestModel;

#[async_trait]
impl ModelLoader for RequestModel {
    fn name(&self) -> &'static str {
        "request"
    }

    async fn populate(&self, seed: &ModelSeed, model: &mut Model) -> Result<(), ModelError> {
        model.insert(
            "request".to_string(),
            json!({
                "device": seed.request.device.as_str(),
                "locale": seed.request.locale,
                "category": seed.request.category,
            }),
        );
        Ok(())
    }
}

/// Exposes the search term to search templates under `search`.
pub struct SearchModel;

#[async_trait]
impl ModelLoader for SearchModel {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn populate(&self, seed: &ModelSeed, model: &mut Model) -> Result<(), ModelError> {
        model.insert(
            "search".to_string(),
            json!({
                "query": seed.request.query.as_deref().unwrap_or(""),
                "category": seed.request.category,
            }),
        );
        Ok(())
    }
}

/// Exposes the locale message bundle to templates under `messages`.
///
/// The bundle locale is the request locale when set, the weblog's own
/// locale otherwise.
pub struct MessagesModel {
    bundles: Arc<dyn MessageBundles>,
}

impl MessagesModel {
    pub fn new(bundles: Arc<dyn MessageBundles>) -> Self {
        Self { bundles }
    }
}

#[async_trait]
impl ModelLoader for MessagesModel {
    fn name(&self) -> &'static str {
        "messages"
    }

    async fn populate(&self, seed: &ModelSeed, model: &mut Model) -> Result<(), ModelError> {
        let locale = seed
            .request
            .locale
            .as_deref()
            .unwrap_or(&seed.weblog.locale);
        let bundle: serde_json::Map<String, Value> = self
            .bundles
            .messages(locale)
            .into_iter()
            .map(|(key, text)| (key, Value::String(text)))
            .collect();
        model.insert("messages".to_string(), Value::Object(bundle));
        Ok(())
    }
}
