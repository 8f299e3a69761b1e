use std::{future::IntoFuture, pin::pin, process, sync::Arc};

use brezza::{
    application::{
        MessagesModel, ModelLoaderRegistry, NewsfeedModel, NewsfeedService, RenderPipeline,
        RendererRegistry, RequestModel, SearchModel, ThemeReloadCoordinator, WeblogModel,
    },
    cache::ExpiringCache,
    config,
    infra::{
        error::InfraError,
        fetch::NewsfeedFetcher,
        http::{HttpState, build_router},
        site::DiskSite,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &InfraError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), InfraError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| InfraError::configuration(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    let site = Arc::new(DiskSite::load(settings.site_dir.clone()).await?);

    let page_cache = Arc::new(ExpiringCache::new(
        "page",
        settings.cache.page_capacity,
        settings.cache.page_ttl(),
    ));
    let site_cache = Arc::new(ExpiringCache::new(
        "site",
        settings.cache.site_capacity,
        settings.cache.site_ttl(),
    ));
    let newsfeed_cache = Arc::new(ExpiringCache::new(
        "newsfeed",
        settings.cache.newsfeed_capacity,
        settings.cache.newsfeed_ttl(),
    ));

    let fetcher = NewsfeedFetcher::new(settings.newsfeed.timeout)
        .map_err(|err| InfraError::configuration(format!("newsfeed client: {err}")))?;
    let newsfeed = Arc::new(NewsfeedService::new(
        fetcher,
        newsfeed_cache,
        settings.newsfeed.cache_failures,
    ));

    let mut loaders = ModelLoaderRegistry::new();
    loaders.register(Arc::new(WeblogModel));
    loaders.register(Arc::new(RequestModel));
    loaders.register(Arc::new(SearchModel));
    loaders.register(Arc::new(MessagesModel::new(site.clone())));
    loaders.register(Arc::new(NewsfeedModel::new(
        newsfeed,
        settings.newsfeed.default_url.clone(),
    )));

    let reload = ThemeReloadCoordinator::new(
        settings.themes.reload,
        site.clone(),
        site.clone(),
        page_cache.clone(),
        site_cache.clone(),
        settings.themes.site_wide_weblog.clone(),
    );

    let pipeline = Arc::new(RenderPipeline::new(
        site.clone(),
        site,
        RendererRegistry::with_defaults(),
        loaders,
        reload,
        page_cache,
        site_cache,
        settings.rendering.pipeline_options(&settings.themes),
    ));

    serve_http(&settings, HttpState { pipeline }).await
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), InfraError> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr).await?;
    info!(
        target = "brezza::server",
        addr = %settings.server.addr,
        "listening"
    );

    let (signal_tx, signal_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = signal_tx.send(());
    };

    let mut server = pin!(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .into_future()
    );

    tokio::select! {
        biased;
        result = &mut server => {
            result?;
        }
        _ = signal_rx => {
            info!(target = "brezza::server", "shutdown signal received, draining connections");
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        target = "brezza::server",
                        timeout_secs = settings.server.graceful_shutdown.as_secs(),
                        "graceful shutdown window elapsed, aborting open connections"
                    );
                }
            }
        }
    }

    Ok(())
}
