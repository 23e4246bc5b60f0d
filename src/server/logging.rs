use std::time::Instant;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, info, warn};

/// Request logging middleware. Health checks are skipped; everything else is
/// logged at a level chosen by status class.
///
/// For streamed completions the duration covers time to first event, not the
/// whole stream, so the `streamed` field marks those entries.
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path().to_string();

    if path == "/health" {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis();
    let streamed = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream"));

    match status {
        500.. => error!(method, path, status, duration_ms, streamed, "request"),
        400..=499 => warn!(method, path, status, duration_ms, streamed, "request"),
        _ => info!(method, path, status, duration_ms, streamed, "request"),
    }

    response
}
