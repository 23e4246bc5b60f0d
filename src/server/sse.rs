//! Streamed response assembly: completion chunks and the `[DONE]` sentinel.

use axum::response::sse::Event;
use tracing::error;

use crate::protocol::CompletionChunk;

/// Transport-level terminator, sent as the final event of every stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Chunks for a successful answer: the full text, then a bare stop chunk.
pub fn success_chunks(request_id: &str, model: &str, content: &str) -> Vec<CompletionChunk> {
    vec![
        CompletionChunk::new(request_id, model, Some(content.to_string()), None),
        CompletionChunk::new(request_id, model, Some(String::new()), Some("stop")),
    ]
}

/// The single chunk carrying a handled error to the client.
pub fn error_chunks(request_id: &str, model: &str, message: &str) -> Vec<CompletionChunk> {
    vec![CompletionChunk::new(
        request_id,
        model,
        Some(message.to_string()),
        Some("error"),
    )]
}

/// Serialize one chunk into an SSE event.
pub fn chunk_event(chunk: &CompletionChunk) -> Event {
    match serde_json::to_string(chunk) {
        Ok(payload) => Event::default().data(payload),
        Err(error) => {
            error!(%error, "failed to serialize completion chunk");
            Event::default().data("{}")
        }
    }
}

/// The terminator event.
pub fn done_event() -> Event {
    Event::default().data(DONE_SENTINEL)
}
