//! API module
//!
//! Router construction, request-id middleware and the diagnosis handler.

pub mod diagnose;

use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
    routing::post,
    Router,
};
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub use diagnose::diagnose;

/// Room for the text fields and multipart framing on top of the image limit
pub const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Header carrying the per-request identifier
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Build the application router
///
/// Only `POST /diagnose/` is routed. CORS is fully permissive.
pub fn router(state: AppState) -> Router {
    let body_limit = state
        .max_upload_bytes()
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/diagnose/", post(diagnose))
        .layer(DefaultBodyLimit::max(body_limit))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive()) // Allow CORS for development
        .with_state(state)
}

/// Request ID middleware - tags each request with an ID for tracing
///
/// An incoming `x-request-id` is reused, otherwise a UUID is generated. The
/// ID is echoed back on the response.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let mut response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }

    response
}
