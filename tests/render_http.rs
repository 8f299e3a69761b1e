//! End-to-end rendering tests over the public HTTP surface, backed by a
//! disk site in a temporary directory.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT},
    },
};
use brezza::{
    application::{
        MessagesModel, ModelLoaderRegistry, PipelineOptions, RenderPipeline, RendererRegistry,
        RequestModel, SearchModel, ThemeReloadCoordinator, WeblogModel,
    },
    cache::{ExpiringCache, PageKey},
    infra::{
        http::{HttpState, build_router},
        site::DiskSite,
    },
};
use bytes::Bytes;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    page_cache: Arc<ExpiringCache<PageKey, Bytes>>,
    site_cache: Arc<ExpiringCache<PageKey, Bytes>>,
    dir: TempDir,
}

fn write_site(dir: &TempDir) {
    fs::write(
        dir.path().join("site.toml"),
        r#"
[[weblogs]]
handle = "demo"
name = "Demo Weblog"
locale = "en"
theme = "plain"
"#,
    )
    .unwrap();

    fs::create_dir_all(dir.path().join("themes")).unwrap();
    fs::write(
        dir.path().join("themes/plain.toml"),
        r#"
default = "main"

[[templates]]
id = "main"
action = "weblog"
language = "placeholder"
contents = "<h1>{{weblog.name}}</h1>"

[[templates]]
id = "results"
action = "search"
language = "placeholder"
contents = "{{messages.searchSummary}} {{search.query}}"
"#,
    )
    .unwrap();

    fs::create_dir_all(dir.path().join("messages")).unwrap();
    fs::write(
        dir.path().join("messages/en.toml"),
        "searchSummary = \"results for\"\n",
    )
    .unwrap();
}

async fn build_app(theme_reload: bool) -> TestApp {
    let dir = TempDir::new().unwrap();
    write_site(&dir);
    let site = Arc::new(DiskSite::load(dir.path()).await.unwrap());

    let page_cache = Arc::new(ExpiringCache::new("page", 32, Duration::from_secs(300)));
    let site_cache = Arc::new(ExpiringCache::new("site", 32, Duration::from_secs(300)));

    let mut loaders = ModelLoaderRegistry::new();
    loaders.register(Arc::new(WeblogModel));
    loaders.register(Arc::new(RequestModel));
    loaders.register(Arc::new(SearchModel));
    loaders.register(Arc::new(MessagesModel::new(site.clone())));

    let reload = ThemeReloadCoordinator::new(
        theme_reload,
        site.clone(),
        site.clone(),
        page_cache.clone(),
        site_cache.clone(),
        None,
    );

    let pipeline = Arc::new(RenderPipeline::new(
        site.clone(),
        site,
        RendererRegistry::with_defaults(),
        loaders,
        reload,
        page_cache.clone(),
        site_cache.clone(),
        PipelineOptions::default(),
    ));

    TestApp {
        router: build_router(HttpState { pipeline }),
        page_cache,
        site_cache,
        dir,
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Bytes) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

#[tokio::test]
async fn page_is_served_with_explicit_content_length() {
    let app = build_app(false).await;
    let (status, headers, body) = get(&app.router, "/weblogs/demo").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from("<h1>Demo Weblog</h1>"));
    assert_eq!(
        headers.get(CONTENT_TYPE).unwrap(),
        "text/html; charset=utf-8"
    );
    assert_eq!(
        headers.get(CONTENT_LENGTH).unwrap().to_str().unwrap(),
        body.len().to_string()
    );
}

#[tokio::test]
async fn unknown_weblog_is_a_bad_request_and_touches_no_cache() {
    let app = build_app(false).await;
    let (status, _, body) = get(&app.router, "/weblogs/no-such-weblog").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.is_empty());
    assert!(app.page_cache.is_empty());
    assert!(app.site_cache.is_empty());
}

#[tokio::test]
async fn search_renders_the_query_and_is_never_cached() {
    let app = build_app(false).await;
    let (status, _, body) = get(&app.router, "/weblogs/demo/search?q=rust").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from("results for rust"));
    assert!(app.page_cache.is_empty());
}

#[tokio::test]
async fn repeated_page_requests_are_memoized() {
    let app = build_app(false).await;
    get(&app.router, "/weblogs/demo").await;
    assert_eq!(app.page_cache.len(), 1);

    let (status, _, body) = get(&app.router, "/weblogs/demo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from("<h1>Demo Weblog</h1>"));
    assert_eq!(app.page_cache.len(), 1);
}

#[tokio::test]
async fn mobile_user_agent_gets_its_own_cache_entry() {
    let app = build_app(false).await;
    get(&app.router, "/weblogs/demo").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/weblogs/demo")
                .header(USER_AGENT, "Mozilla/5.0 (iPhone) Mobile Safari")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.page_cache.len(), 2);
}

#[tokio::test]
async fn theme_edit_purges_the_cache_and_shows_up_on_the_next_request() {
    let app = build_app(true).await;
    let (_, _, body) = get(&app.router, "/weblogs/demo").await;
    assert_eq!(body, Bytes::from("<h1>Demo Weblog</h1>"));

    fs::write(
        app.dir.path().join("themes/plain.toml"),
        r#"
default = "main"

[[templates]]
id = "main"
action = "weblog"
language = "placeholder"
contents = "<h2>{{weblog.name}}</h2>"
"#,
    )
    .unwrap();

    let (status, _, body) = get(&app.router, "/weblogs/demo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from("<h2>Demo Weblog</h2>"));
}

#[tokio::test]
async fn health_endpoint_responds_without_content() {
    let app = build_app(false).await;
    let (status, _, body) = get(&app.router, "/_health").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}
