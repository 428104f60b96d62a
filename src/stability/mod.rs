//! Stability image-editing API integration
//!
//! This module wraps the two edit endpoints the tool uses:
//! - replace-background-and-relight: asynchronous; submission returns a job
//!   id that is polled at a result endpoint
//! - remove-background: synchronous; the finished image comes back directly

mod client;
pub mod options;
pub mod types;

pub use client::StabilityClient;
pub use options::{LightDirection, OutputFormat, RelightOptions};
pub use types::{
    AcceptMode, ErrorResponse, JobState, PollOutcome, ResultArtifact, ResultPayload,
    StructuredResult, SubmitResponse,
};
