//! Public rendering surface.
//!
//! Thin axum handlers over the render pipeline: translate path, query and
//! user agent into a [`RenderRequest`], hand the rendered bytes back with
//! an explicit content length, and map pipeline errors to bare status
//! responses. Error detail stays in the logs.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderMap, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{debug, error};

use crate::application::{RenderError, RenderParams, RenderPipeline, RenderRequest, RenderedPage};

const SOURCE: &str = "infra::http::public";
const HTML_UTF8: &str = "text/html; charset=utf-8";

#[derive(Clone)]
pub struct HttpState {
    pub pipeline: Arc<RenderPipeline>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/weblogs/{handle}", get(weblog_page))
        .route("/weblogs/{handle}/search", get(weblog_search))
        .route("/_health", get(health))
        .with_state(state)
}

async fn weblog_page(
    State(state): State<HttpState>,
    Path(handle): Path<String>,
    Query(params): Query<RenderParams>,
    headers: HeaderMap,
) -> Response {
    let request = match build_request(&handle, params, &headers) {
        Ok(request) => request,
        Err(err) => return error_response("page", &handle, err),
    };
    match state.pipeline.render_page(request).await {
        Ok(page) => rendered_response("page", &handle, page),
        Err(err) => error_response("page", &handle, err),
    }
}

async fn weblog_search(
    State(state): State<HttpState>,
    Path(handle): Path<String>,
    Query(params): Query<RenderParams>,
    headers: HeaderMap,
) -> Response {
    let request = match build_request(&handle, params, &headers) {
        Ok(request) => request,
        Err(err) => return error_response("search", &handle, err),
    };
    match state.pipeline.render_search(request).await {
        Ok(page) => rendered_response("search", &handle, page),
        Err(err) => error_response("search", &handle, err),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn build_request(
    handle: &str,
    params: RenderParams,
    headers: &HeaderMap,
) -> Result<RenderRequest, RenderError> {
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    RenderRequest::new(handle, params, user_agent)
}

fn rendered_response(surface: &'static str, handle: &str, page: RenderedPage) -> Response {
    debug!(
        target = SOURCE,
        surface,
        weblog = handle,
        bytes = page.content_length,
        "rendered page"
    );
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, HTML_UTF8.to_string()),
            (CONTENT_LENGTH, page.content_length.to_string()),
        ],
        Body::from(page.bytes),
    )
        .into_response()
}

fn error_response(surface: &'static str, handle: &str, err: RenderError) -> Response {
    let status = err.status();
    error!(
        target = SOURCE,
        surface,
        weblog = handle,
        status = status.as_u16(),
        error = %err,
        "render request failed"
    );
    status.into_response()
}
