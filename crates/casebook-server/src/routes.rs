use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{self, cases, jobs, nlp};
use crate::state::AppState;

pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    Router::new()
        .route("/health", get(handlers::health))
        .route("/info", get(handlers::info))
        .route("/status", get(handlers::status))
        .route("/legal/analyze", post(nlp::legal_analyze))
        .route("/pii/analyze", post(nlp::pii_analyze))
        .route("/pii/anonymize", post(nlp::pii_anonymize))
        .route("/dates/extract", post(nlp::dates_extract))
        .route("/analysis/reset", post(cases::reset_analysis))
        .route("/cases", get(cases::list).post(cases::create))
        .route(
            "/cases/{id}",
            get(cases::get).patch(cases::update).delete(cases::delete),
        )
        .route("/cases/{id}/documents", get(cases::documents).post(jobs::upload))
        .route("/cases/{id}/chronology", get(cases::chronology))
        .route("/cases/{id}/chronology.csv", get(cases::chronology_csv))
        .route(
            "/cases/{id}/compliance",
            get(cases::get_compliance).post(cases::run_compliance),
        )
        .route("/cases/{id}/compliance.csv", get(cases::compliance_csv))
        .route("/cases/{id}/analysis", post(cases::run_analysis))
        .route(
            "/cases/{id}/state/{kind}",
            get(cases::get_state).put(cases::put_state),
        )
        .route("/jobs/{job_id}/events", get(jobs::events))
        .route("/jobs/{job_id}", delete(jobs::cancel))
        .layer(trace_layer)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
