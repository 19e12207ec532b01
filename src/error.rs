//! Error types for the transport layer.

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request failed with status {status}")]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Text shown to the user: the server's `detail` when it sent one,
    /// otherwise the transport description.
    pub fn reason(&self) -> String {
        match self {
            TransportError::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.to_string(),
        }
    }
}
