use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::extract::State;
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info};
use uuid::Uuid;

use crate::protocol::{self, ChatCompletionRequest, HealthResponse, ModelList};
use crate::server::sse;
use crate::upstream::MachineTranslation;

/// Shared application state.
pub struct AppState {
    pub upstream: Arc<MachineTranslation>,
    pub models: Vec<String>,
    pub default_model: String,
}

/// Root banner.
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!(
            "{} v{} is running.",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ),
    }))
}

/// Health check handler.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        upstream: Some("machinetranslation".to_string()),
    })
}

/// Model listing: the aggregate pseudo-model plus each configured engine.
pub async fn models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ModelList::new(&state.models))
}

/// Chat completions. Always answered as an SSE stream whatever the request's
/// stream flag says; fatal pipeline errors surface as a single error chunk on
/// the same channel, and the `[DONE]` sentinel closes every stream.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    let request_id = format!("chatcmpl-{}", Uuid::new_v4());
    let model = request
        .model
        .clone()
        .unwrap_or_else(|| state.default_model.clone());

    info!(request_id = %request_id, model = %model, "chat completion request");

    let stream = stream! {
        let chunks = match protocol::last_user_message(&request.messages) {
            None => sse::error_chunks(&request_id, &model, "no user message found in request"),
            Some(text) => match state.upstream.translate(text, &model).await {
                Ok(markdown) => sse::success_chunks(&request_id, &model, &markdown),
                Err(error) => {
                    error!(request_id = %request_id, %error, "translation pipeline failed");
                    sse::error_chunks(
                        &request_id,
                        &model,
                        &format!("error while handling the request: {error}"),
                    )
                }
            },
        };

        for chunk in chunks {
            yield Ok::<_, Infallible>(sse::chunk_event(&chunk));
        }
        // The terminator goes out on every exit path.
        yield Ok(sse::done_event());
    };

    Sse::new(stream).into_response()
}
