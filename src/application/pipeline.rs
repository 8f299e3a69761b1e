//! Page render pipeline.
//!
//! One request flows through resolve, reload, template selection, cache
//! probe, model build and render dispatch, in that order. The cache probe
//! sits after template resolution so a cached hit still reflects the
//! template the current theme would pick, and before the model build so a
//! hit skips all loader work.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use metrics::histogram;
use serde_json::json;
use tracing::debug;

use crate::cache::{ExpiringCache, PageKey};
use crate::domain::{ComponentType, ThemeSource, WeblogRepo};

use super::error::RenderError;
use super::model::{Model, ModelLoaderRegistry, ModelSeed};
use super::render::{RenderedPage, RendererRegistry, render_content};
use super::request::RenderRequest;
use super::templates;
use super::theme_reload::ThemeReloadCoordinator;

const SOURCE: &str = "application::pipeline";

/// Pipeline knobs resolved from settings at startup.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Loader names for ordinary weblog pages.
    pub page_models: Vec<String>,
    /// Loader names for pages of the site-wide weblog.
    pub site_models: Vec<String>,
    /// Loader names for search result pages.
    pub search_models: Vec<String>,
    /// Upper bound on rendered output, in bytes.
    pub output_ceiling: usize,
    /// Handle of the weblog serving the site front page, if any.
    pub site_wide_handle: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            page_models: vec![
                "weblog".to_string(),
                "request".to_string(),
                "messages".to_string(),
            ],
            site_models: vec![
                "weblog".to_string(),
                "request".to_string(),
                "messages".to_string(),
            ],
            search_models: vec![
                "weblog".to_string(),
                "request".to_string(),
                "messages".to_string(),
                "search".to_string(),
            ],
            output_ceiling: 1024 * 1024,
            site_wide_handle: None,
        }
    }
}

pub struct RenderPipeline {
    weblogs: Arc<dyn WeblogRepo>,
    themes: Arc<dyn ThemeSource>,
    renderers: RendererRegistry,
    loaders: ModelLoaderRegistry,
    reload: ThemeReloadCoordinator,
    page_cache: Arc<ExpiringCache<PageKey, Bytes>>,
    site_cache: Arc<ExpiringCache<PageKey, Bytes>>,
    options: PipelineOptions,
}

impl RenderPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        weblogs: Arc<dyn WeblogRepo>,
        themes: Arc<dyn ThemeSource>,
        renderers: RendererRegistry,
        loaders: ModelLoaderRegistry,
        reload: ThemeReloadCoordinator,
        page_cache: Arc<ExpiringCache<PageKey, Bytes>>,
        site_cache: Arc<ExpiringCache<PageKey, Bytes>>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            weblogs,
            themes,
            renderers,
            loaders,
            reload,
            page_cache,
            site_cache,
            options,
        }
    }

    /// Render a weblog page. Output is memoized per key.
    pub async fn render_page(&self, request: RenderRequest) -> Result<RenderedPage, RenderError> {
        self.execute(request, ComponentType::Weblog, true).await
    }

    /// Render search results. Never cached: the term varies per request.
    pub async fn render_search(&self, request: RenderRequest) -> Result<RenderedPage, RenderError> {
        self.execute(request, ComponentType::Search, false).await
    }

    async fn execute(
        &self,
        mut request: RenderRequest,
        component: ComponentType,
        cacheable: bool,
    ) -> Result<RenderedPage, RenderError> {
        let started = Instant::now();

        let weblog = self
            .weblogs
            .resolve(&request.weblog_handle)
            .await
            .ok_or_else(|| {
                RenderError::request_invalid(format!(
                    "unknown weblog `{}`",
                    request.weblog_handle
                ))
            })?;

        self.reload.maybe_reload(&weblog).await;
        request.force_locale(&weblog);
        if let Some(url) = &weblog.newsfeed_url {
            request = request.with_context("newsfeedUrl", json!(url));
        }

        let theme =
            self.themes
                .theme(&weblog.editor_theme)
                .ok_or_else(|| RenderError::NoTemplateAvailable {
                    weblog: weblog.handle.clone(),
                    theme: weblog.editor_theme.clone(),
                })?;
        let template = templates::resolve(&weblog, &theme, component)?;

        let site_wide = self.options.site_wide_handle.as_deref() == Some(weblog.handle.as_str());
        let cache = if site_wide {
            &self.site_cache
        } else {
            &self.page_cache
        };

        let key = cacheable.then(|| {
            PageKey::for_component(
                &weblog.handle,
                component,
                &template.id,
                request.device,
                request.locale.as_deref(),
            )
        });
        if let Some(key) = &key {
            if let Some(bytes) = cache.get(key) {
                debug!(target = SOURCE, key = %key, "serving memoized page");
                return Ok(RenderedPage {
                    content_length: bytes.len(),
                    bytes,
                });
            }
        }

        let renderer = self.renderers.select(template, request.device)?;
        // Search on the site-wide weblog carries the site model set on top
        // of the search set.
        let names: Cow<'_, [String]> = match component {
            ComponentType::Search if site_wide => {
                let mut combined = self.options.search_models.clone();
                for name in &self.options.site_models {
                    if !combined.contains(name) {
                        combined.push(name.clone());
                    }
                }
                Cow::Owned(combined)
            }
            ComponentType::Search => Cow::Borrowed(self.options.search_models.as_slice()),
            _ if site_wide => Cow::Borrowed(self.options.site_models.as_slice()),
            _ => Cow::Borrowed(self.options.page_models.as_slice()),
        };
        let seed = ModelSeed { weblog, request };
        let mut model = Model::new();
        self.loaders.load_models(&names, &seed, &mut model).await?;

        let page = render_content(
            renderer.as_ref(),
            template,
            &model,
            self.options.output_ceiling,
        )?;

        if let Some(key) = key {
            cache.put(key, page.bytes.clone());
        }

        histogram!("brezza_render_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;
    use time::macros::datetime;

    use crate::application::model::{
        MessagesModel, ModelError, ModelLoader, RequestModel, SearchModel, WeblogModel,
    };
    use crate::application::request::RenderParams;
    use crate::domain::{
        DomainError, MessageBundles, TemplateLanguage, Theme, ThemeTemplate, Weblog,
    };

    use super::*;

    struct FixedSite {
        weblogs: HashMap<String, Arc<Weblog>>,
        themes: HashMap<String, Arc<Theme>>,
    }

    #[async_trait]
    impl WeblogRepo for FixedSite {
        async fn resolve(&self, handle: &str) -> Option<Arc<Weblog>> {
            self.weblogs.get(handle).cloned()
        }
    }

    #[async_trait]
    impl ThemeSource for FixedSite {
        fn theme(&self, name: &str) -> Option<Arc<Theme>> {
            self.themes.get(name).cloned()
        }

        async fn reload_from_disk(&self, _name: &str) -> Result<bool, DomainError> {
            Ok(false)
        }
    }

    struct NoBundles;

    impl MessageBundles for NoBundles {
        fn reload(&self, _locale: &str) {}
        fn messages(&self, _locale: &str) -> HashMap<String, String> {
            HashMap::new()
        }
    }

    /// Copies the newsfeed url context into the model for assertions.
    struct FeedUrlModel;

    #[async_trait]
    impl ModelLoader for FeedUrlModel {
        fn name(&self) -> &'static str {
            "feedurl"
        }

        async fn populate(&self, seed: &ModelSeed, model: &mut Model) -> Result<(), ModelError> {
            let url = seed
                .request
                .context
                .get("newsfeedUrl")
                .and_then(Value::as_str)
                .unwrap_or("");
            model.insert("feedurl".to_string(), Value::String(url.to_string()));
            Ok(())
        }
    }

    fn template(id: &str, action: ComponentType, contents: &str) -> ThemeTemplate {
        ThemeTemplate {
            id: id.to_string(),
            name: id.to_string(),
            action,
            language: TemplateLanguage::Placeholder,
            contents: contents.to_string(),
            last_modified: datetime!(2026-01-01 00:00 UTC),
        }
    }

    fn weblog_named(handle: &str, newsfeed_url: Option<&str>) -> Arc<Weblog> {
        Arc::new(Weblog {
            handle: handle.to_string(),
            name: "Demo".to_string(),
            locale: "en".to_string(),
            show_all_langs: true,
            editor_theme: "plain".to_string(),
            newsfeed_url: newsfeed_url.map(str::to_string),
        })
    }

    fn site_with(weblog: Arc<Weblog>, templates: Vec<ThemeTemplate>) -> Arc<FixedSite> {
        let theme = Arc::new(Theme::new("plain", templates, Some("main".to_string())));
        Arc::new(FixedSite {
            weblogs: HashMap::from([(weblog.handle.clone(), weblog)]),
            themes: HashMap::from([("plain".to_string(), theme)]),
        })
    }

    fn site() -> Arc<FixedSite> {
        site_with(
            weblog_named("demo", None),
            vec![
                template("main", ComponentType::Weblog, "<h1>{{weblog.name}}</h1>"),
                template(
                    "results",
                    ComponentType::Search,
                    "results for {{search.query}}",
                ),
            ],
        )
    }

    fn pipeline(site: Arc<FixedSite>) -> RenderPipeline {
        pipeline_with(site, PipelineOptions::default())
    }

    fn pipeline_with(site: Arc<FixedSite>, options: PipelineOptions) -> RenderPipeline {
        let page_cache = Arc::new(ExpiringCache::new("page-test", 16, Duration::from_secs(60)));
        let site_cache = Arc::new(ExpiringCache::new("site-test", 16, Duration::from_secs(60)));
        let reload = ThemeReloadCoordinator::new(
            false,
            site.clone(),
            Arc::new(NoBundles),
            page_cache.clone(),
            site_cache.clone(),
            None,
        );
        let mut loaders = ModelLoaderRegistry::new();
        loaders.register(Arc::new(WeblogModel));
        loaders.register(Arc::new(RequestModel));
        loaders.register(Arc::new(SearchModel));
        loaders.register(Arc::new(MessagesModel::new(Arc::new(NoBundles))));
        loaders.register(Arc::new(FeedUrlModel));
        RenderPipeline::new(
            site.clone(),
            site,
            RendererRegistry::with_defaults(),
            loaders,
            reload,
            page_cache,
            site_cache,
            options,
        )
    }

    fn request(handle: &str, params: RenderParams) -> RenderRequest {
        RenderRequest::new(handle, params, None).unwrap()
    }

    #[tokio::test]
    async fn page_render_flows_model_into_template() {
        let pipeline = pipeline(site());
        let page = pipeline
            .render_page(request("demo", RenderParams::default()))
            .await
            .unwrap();
        assert_eq!(page.bytes, Bytes::from("<h1>Demo</h1>"));
        assert_eq!(page.content_length, page.bytes.len());
    }

    #[tokio::test]
    async fn unknown_weblog_is_a_bad_request() {
        let pipeline = pipeline(site());
        let err = pipeline
            .render_page(request("no-such", RenderParams::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::RequestInvalid(_)));
    }

    #[tokio::test]
    async fn second_page_render_is_served_from_cache() {
        let site = site();
        let pipeline = pipeline(site.clone());
        let first = pipeline
            .render_page(request("demo", RenderParams::default()))
            .await
            .unwrap();
        let second = pipeline
            .render_page(request("demo", RenderParams::default()))
            .await
            .unwrap();
        assert_eq!(first.bytes, second.bytes);
        assert!(!pipeline.page_cache.is_empty());
    }

    #[tokio::test]
    async fn search_renders_query_and_is_never_cached() {
        let pipeline = pipeline(site());
        let params = RenderParams {
            q: Some("rust".to_string()),
            ..Default::default()
        };
        let page = pipeline
            .render_search(request("demo", params))
            .await
            .unwrap();
        assert_eq!(page.bytes, Bytes::from("results for rust"));
        assert!(pipeline.page_cache.is_empty());
        assert!(pipeline.site_cache.is_empty());
    }

    #[tokio::test]
    async fn device_classes_memoize_separately() {
        let pipeline = pipeline(site());
        let standard = request("demo", RenderParams::default());
        let mobile = RenderRequest::new(
            "demo",
            RenderParams {
                device: Some("mobile".to_string()),
                ..Default::default()
            },
            None,
        )
        .unwrap();
        pipeline.render_page(standard).await.unwrap();
        pipeline.render_page(mobile).await.unwrap();
        assert_eq!(pipeline.page_cache.len(), 2);
    }

    #[tokio::test]
    async fn site_wide_search_also_loads_site_models() {
        let site = site_with(
            weblog_named("demo", None),
            vec![
                template("main", ComponentType::Weblog, "<h1>{{weblog.name}}</h1>"),
                template(
                    "results",
                    ComponentType::Search,
                    "{{weblog.name}}|{{search.query}}",
                ),
            ],
        );
        let options = PipelineOptions {
            search_models: vec!["search".to_string()],
            site_models: vec!["weblog".to_string()],
            site_wide_handle: Some("demo".to_string()),
            ..PipelineOptions::default()
        };
        let pipeline = pipeline_with(site, options);
        let params = RenderParams {
            q: Some("rust".to_string()),
            ..Default::default()
        };

        let page = pipeline
            .render_search(request("demo", params))
            .await
            .unwrap();
        assert_eq!(page.bytes, Bytes::from("Demo|rust"));
        assert!(pipeline.site_cache.is_empty());
    }

    #[tokio::test]
    async fn weblog_newsfeed_url_reaches_the_model_context() {
        let site = site_with(
            weblog_named("demo", Some("https://example.org/feed")),
            vec![template("main", ComponentType::Weblog, "feed={{feedurl}}")],
        );
        let options = PipelineOptions {
            page_models: vec!["feedurl".to_string()],
            ..PipelineOptions::default()
        };
        let pipeline = pipeline_with(site, options);

        let page = pipeline
            .render_page(request("demo", RenderParams::default()))
            .await
            .unwrap();
        assert_eq!(page.bytes, Bytes::from("feed=https://example.org/feed"));
    }

    #[tokio::test]
    async fn missing_theme_is_a_server_error() {
        let weblog = Arc::new(Weblog {
            handle: "demo".to_string(),
            name: "Demo".to_string(),
            locale: "en".to_string(),
            show_all_langs: true,
            editor_theme: "vanished".to_string(),
            newsfeed_url: None,
        });
        let site = Arc::new(FixedSite {
            weblogs: HashMap::from([("demo".to_string(), weblog)]),
            themes: HashMap::new(),
        });
        let pipeline = pipeline(site);
        let err = pipeline
            .render_page(request("demo", RenderParams::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::NoTemplateAvailable { .. }));
    }
}
