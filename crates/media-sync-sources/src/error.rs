use thiserror::Error;

/// Outcome of a failed provider call.
///
/// `NotFound` is the only kind the orchestrator treats as data ("this
/// collection does not exist"); everything else is a failure.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error after retries: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }

    /// Errors that make every later call pointless: bad credentials or a
    /// service that stayed unreachable through all retries.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Authentication(_) | SourceError::Network(_))
    }
}
