//! Error types for relight

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelightError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Job submission rejected by the service: {0}")]
    Submission(String),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Poll attempt failed: {0}")]
    TransientPoll(String),

    #[error("Service returned status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Unrecognized result payload: {0}")]
    UnrecognizedPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid base64 artifact data: {0}")]
    ArtifactDecode(#[from] base64::DecodeError),

    #[error("File system error")]
    Io(#[from] std::io::Error),
}

impl RelightError {
    /// Whether this error consumes a single poll attempt rather than the
    /// whole session. Timeouts and connection failures during a poll are
    /// retried on the next attempt; everything else aborts.
    pub fn is_transient(&self) -> bool {
        matches!(self, RelightError::TransientPoll(_))
    }
}

pub type Result<T> = std::result::Result<T, RelightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_preserves_diagnostic() {
        let err = RelightError::Remote {
            status: 400,
            message: "invalid_prompt: background_prompt is required".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("invalid_prompt: background_prompt is required"));
        assert!(rendered.contains("400"));
    }

    #[test]
    fn only_poll_level_failures_are_transient() {
        assert!(RelightError::TransientPoll("timed out".to_string()).is_transient());
        assert!(!RelightError::Validation("empty image".to_string()).is_transient());
        assert!(!RelightError::Remote {
            status: 500,
            message: "internal".to_string(),
        }
        .is_transient());
    }
}
