//! Type definitions for the Stability image-editing REST API

use serde::Deserialize;

/// Response from submitting an async edit job
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// Opaque job identifier used for all subsequent result requests
    pub id: String,
}

/// Structured (JSON) form of a finished result
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredResult {
    #[serde(default)]
    pub artifacts: Vec<ResultArtifact>,
}

/// One produced image inside a structured result
#[derive(Debug, Clone, Deserialize)]
pub struct ResultArtifact {
    /// Base64-encoded image bytes; absent for filtered results
    pub base64: Option<String>,

    /// Seed the service actually used
    pub seed: Option<u64>,

    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

impl ResultArtifact {
    /// Whether the service flagged this artifact as filtered rather than
    /// generated
    pub fn is_filtered(&self) -> bool {
        matches!(self.finish_reason.as_deref(), Some("CONTENT_FILTERED"))
    }
}

/// Error body the service returns on rejected requests
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub name: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ErrorResponse {
    /// Flatten the remote diagnostic into one line, falling back to the raw
    /// body when the shape is unexpected.
    pub fn into_message(self, raw: &str) -> String {
        match (self.name, self.errors.is_empty()) {
            (Some(name), false) => format!("{}: {}", name, self.errors.join("; ")),
            (Some(name), true) => name,
            (None, false) => self.errors.join("; "),
            (None, true) => raw.to_string(),
        }
    }
}

/// Which result encodings the caller is willing to accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AcceptMode {
    /// Raw image bytes only
    Image,
    /// Structured JSON with embedded artifacts only
    Structured,
    /// Either form; the service picks
    #[default]
    Either,
}

impl AcceptMode {
    /// Value for the request's `Accept` header
    pub fn header_value(&self) -> &'static str {
        match self {
            AcceptMode::Image => "image/*",
            AcceptMode::Structured => "application/json",
            AcceptMode::Either => "image/*, application/json",
        }
    }
}

impl std::fmt::Display for AcceptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AcceptMode::Image => "image",
            AcceptMode::Structured => "structured",
            AcceptMode::Either => "either",
        };
        f.write_str(name)
    }
}

/// A finished result as returned by the service
#[derive(Debug, Clone)]
pub enum ResultPayload {
    /// Raw image bytes with the content type the service declared
    Binary {
        content_type: String,
        bytes: Vec<u8>,
    },
    /// JSON body with zero or more embedded artifacts
    Structured(StructuredResult),
}

/// Classified outcome of one poll request
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The job finished and the payload was retrieved
    Ready(ResultPayload),
    /// Accepted but not finished (202)
    Pending,
    /// Not visible yet (404); new jobs surface eventually, so this is
    /// equivalent to Pending
    NotFound,
}

/// Lifecycle state of a job as seen from this client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Pending,
    Completed,
    Failed,
    Abandoned,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Abandoned
        )
    }
}
