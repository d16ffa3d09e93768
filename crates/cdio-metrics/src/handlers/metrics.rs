use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

use crate::router::ExporterState;

pub const TEXT_FORMAT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn prometheus_metrics(State(state): State<Arc<ExporterState>>) -> impl IntoResponse {
    let payload = state.registry.render_prometheus().await;

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(TEXT_FORMAT_CONTENT_TYPE),
    );

    response
}

pub async fn track_http_metrics(
    State(state): State<Arc<ExporterState>>,
    request: Request,
    next: Next,
) -> Response {
    let started_at = Instant::now();
    let method = request.method().as_str().to_string();
    let _in_flight = state.http_metrics.request_started();

    let response = next.run(request).await;
    let status = response.status().as_u16();
    state
        .http_metrics
        .record_request(&method, status, started_at.elapsed());

    response
}
