use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::protocol::ErrorResponse;

/// Client authorization settings: one static bearer key, or disabled when no
/// key is configured.
#[derive(Debug, Clone)]
pub struct ApiAuth {
    key: Option<String>,
}

impl ApiAuth {
    pub fn new(key: Option<String>) -> Self {
        let key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self { key }
    }

    pub fn enabled(&self) -> bool {
        self.key.is_some()
    }
}

/// Auth middleware: compares the presented bearer token against the
/// configured master key.
pub async fn auth_middleware(auth: Arc<ApiAuth>, req: Request<Body>, next: Next) -> Response {
    let Some(expected) = auth.key.as_deref() else {
        return next.run(req).await;
    };

    let header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    match header.and_then(bearer_token) {
        Some(token) if token == expected => next.run(req).await,
        Some(_) => auth_error(StatusCode::FORBIDDEN, "invalid API key"),
        None => auth_error(StatusCode::UNAUTHORIZED, "missing authorization"),
    }
}

/// Extract the token from a `Bearer …` authorization header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn auth_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
