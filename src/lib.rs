//! Relight - client for Stability AI background replacement and relighting
//!
//! The replace-background-and-relight endpoint runs asynchronously: a
//! multipart submission returns a job id, and the result is fetched from a
//! polling endpoint that answers 202 (still processing) or 404 (job not
//! visible yet) until the image is ready. This crate wraps that protocol:
//!
//! 1. Submit the subject image plus options, get a job id
//! 2. Poll the result endpoint on a bounded schedule
//! 3. Persist the returned image(s), named from the job id
//!
//! Running out of attempts is a normal outcome, not a failure - the job may
//! still finish server-side and the id can be retried later.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod poller;
pub mod stability;

pub use config::ApiConfig;
pub use error::{RelightError, Result};
pub use poller::{PollSession, PollerConfig, ResultSource, SessionReport};
pub use stability::{
    AcceptMode, JobState, LightDirection, OutputFormat, PollOutcome, RelightOptions,
    ResultPayload, StabilityClient,
};
