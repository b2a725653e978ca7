// File: src/http.rs
// Purpose: axum surface: every path goes through the engine

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::CacheConfig;
use crate::engine::{Engine, Outcome};
use crate::reload::{reload_socket, RELOAD_PATH};

/// Debug header carrying `HIT` or `MISS`
pub const CACHE_HEADER: &str = "x-strata-cache";

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Router serving the site; the reload socket is mounted only when the
/// engine has a reload hub
pub fn app(engine: Arc<Engine>) -> Router {
    let mut router = Router::new();

    if engine.reload_hub().is_some() {
        router = router.route(RELOAD_PATH, get(reload_socket));
    }

    router.fallback(page_handler).with_state(engine)
}

async fn page_handler(State(engine): State<Arc<Engine>>, uri: Uri, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let raw = uri.path();

    let path = urlencoding::decode(raw)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let outcome = engine.handle(&path, accepts_gzip(&headers)).await;
    let status = outcome.status();
    let response = outcome_response(outcome, &engine.config().cache);

    if engine.runtime().is_dev() && should_log(raw) {
        info!(
            path = %raw,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request"
        );
    }

    response
}

/// Converts an engine outcome into a response with the right headers
///
/// With caching on, the same path may be answered gzip or plain, so page
/// responses carry `vary: accept-encoding`.
pub fn outcome_response(outcome: Outcome, cache: &CacheConfig) -> Response {
    match outcome {
        Outcome::Page(rendered) => {
            let mut response = (
                StatusCode::OK,
                [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)],
                rendered.body,
            )
                .into_response();

            let headers = response.headers_mut();
            if let Some(encoding) = rendered.encoding.header_value() {
                headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
            }
            if cache.enabled {
                headers.insert(header::VARY, HeaderValue::from_static("accept-encoding"));
            }
            if cache.debug_headers {
                headers.insert(
                    HeaderName::from_static(CACHE_HEADER),
                    HeaderValue::from_static(rendered.cache.as_str()),
                );
            }

            response
        }
        Outcome::Error(page) => {
            let content_type = if page.is_html {
                HTML_CONTENT_TYPE
            } else {
                TEXT_CONTENT_TYPE
            };
            (page.status, [(header::CONTENT_TYPE, content_type)], page.body).into_response()
        }
        Outcome::ServerError(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
            message,
        )
            .into_response(),
    }
}

/// Whether `accept-encoding` lists gzip with a non-zero quality
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| {
            let mut parts = token.split(';').map(str::trim);
            let name = parts.next().unwrap_or_default();
            let disabled = parts.any(|p| {
                p.strip_prefix("q=")
                    .and_then(|q| q.parse::<f32>().ok())
                    .is_some_and(|q| q == 0.0)
            });

            (name.eq_ignore_ascii_case("gzip") || name == "*") && !disabled
        })
}

/// Paths browsers request on their own are not logged
pub fn should_log(path: &str) -> bool {
    !(path.starts_with("/.well-known") || path == "/favicon.ico" || path == "/robots.txt")
}
