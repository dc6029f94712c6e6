use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{bus, jobs, modules, settings};
use crate::AppState;

/// Builds the operational HTTP surface (spec §4.10), grounded on
/// `rootsignal-api::main`'s `Router` + `tower-http` layering.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/modules", get(modules::list_modules))
        .route("/api/settings/{module}", get(settings::get_module_settings))
        .route("/api/settings/{module}/{key}", get(settings::get_one_setting).put(settings::put_setting))
        .route("/api/jobs/status", get(jobs::job_status))
        .route("/api/jobs/run", post(jobs::run_job))
        .route("/api/bus/history", get(bus::history))
        .route("/api/bus/stream", get(bus::stream_messages))
        .route("/api/logs/stream", get(bus::stream_logs))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!("http_request", method = %request.method(), path = %request.uri().path())
            }),
        )
}
