//! Application router shared by the binary and the integration tests.
//!
//! [`build_app_router`] is the only place the middleware stack is
//! assembled, so `main.rs` and `tests/common/mod.rs` serve identical
//! routers.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::middleware::actor::{ACTOR_ID_HEADER, ACTOR_NAME_HEADER};
use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Routes plus middleware, outermost layer last:
///
/// - CORS answers preflights before anything else runs.
/// - Every request gets an `x-request-id` (kept if the client sent one).
/// - The request span records method, path and status at INFO.
/// - The id is copied onto the response.
/// - Slow handlers are cut off with 408.
/// - A panicking handler becomes a 500 instead of a dropped connection.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    let http_trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        // `/health` sits outside the versioned API.
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        // Innermost: closest to the handlers.
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(http_trace)
        // Must wrap the trace layer so the span sees the id.
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// CORS for the configured origins. Only the verbs the API serves and the
/// headers it reads are allowed.
///
/// Panics on an origin that is not a valid header value; startup should
/// stop on a bad `CORS_ORIGINS`.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin
                .parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{origin}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(ACTOR_ID_HEADER),
            HeaderName::from_static(ACTOR_NAME_HEADER),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(origins: &[&str]) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: origins.iter().map(|o| o.to_string()).collect(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
        }
    }

    #[test]
    fn valid_origins_build_a_layer() {
        build_cors_layer(&config(&["http://localhost:5173", "https://ci.example.com"]));
    }

    #[test]
    #[should_panic(expected = "Invalid CORS origin")]
    fn invalid_origin_stops_startup() {
        build_cors_layer(&config(&["bad\norigin"]));
    }
}
