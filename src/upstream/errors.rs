use thiserror::Error;

/// Upstream pipeline errors. Every variant is fatal to its request and is
/// surfaced to the client as a single error chunk on the response stream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to open translation session: {0}")]
    SessionCreation(String),

    #[error("transport handshake failed: {0}")]
    Handshake(String),

    #[error("failed to fetch scored report: {0}")]
    ReportFetch(String),

    #[error("upstream returned no translations")]
    EmptyTranslationSet,
}
