use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{Instrument, Span, info};

/// Logs `http_request` with path, status and elapsed milliseconds.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let ms = (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;
    info!(
        path = %path,
        status = response.status().as_u16(),
        ms,
        "http_request"
    );
    response
}

/// Runs the rest of the stack inside `span`.
pub async fn in_span(State(span): State<Span>, request: Request, next: Next) -> Response {
    next.run(request).instrument(span).await
}
