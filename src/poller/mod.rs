//! Polling a submitted job until its result is ready
//!
//! This module provides:
//! - PollSession: bounded poll loop with a cancellable inter-attempt delay
//! - PollerConfig: attempt budget, interval, accept mode, output location
//! - ResultSource: the seam between the loop and the HTTP client

pub mod config;
pub mod session;

use crate::error::Result;
use crate::stability::types::{AcceptMode, PollOutcome};
use async_trait::async_trait;

pub use config::PollerConfig;
pub use session::{AttemptOutcome, AttemptRecord, PollSession, SessionReport};

/// Source of poll outcomes for one job.
///
/// The HTTP client implements this; tests drive the session with a scripted
/// source instead.
#[async_trait]
pub trait ResultSource {
    async fn poll(&self, job_id: &str, accept: AcceptMode) -> Result<PollOutcome>;
}
