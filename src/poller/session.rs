//! Bounded polling session for one submitted job

use crate::artifacts::save_payload;
use crate::error::Result;
use crate::poller::{PollerConfig, ResultSource};
use crate::stability::types::{JobState, PollOutcome};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Observed outcome of a single poll attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    NotFound,
    Ready,
    /// Transient transport failure; the attempt is consumed, the session
    /// continues
    Error(String),
}

/// One attempt within a session, in submission order
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 1-based attempt index
    pub ordinal: u32,
    /// Delay actually waited before this attempt (zero for the first)
    pub waited: Duration,
    pub outcome: AttemptOutcome,
}

/// What a finished session looked like
#[derive(Debug)]
pub struct SessionReport {
    pub job_id: String,
    /// Completed when a result was retrieved and persisted; Abandoned when
    /// the attempt budget ran out (or the session was cancelled) without a
    /// terminal answer
    pub state: JobState,
    pub attempts: Vec<AttemptRecord>,
    /// Files written, in artifact order
    pub saved: Vec<PathBuf>,
}

impl SessionReport {
    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }
}

/// Polls one job until its result is ready, the budget runs out, or the
/// remote reports a permanent failure.
///
/// One session, one job, no overlapping requests. The inter-attempt delay is
/// the only suspension point and is cancellable through the session's token.
pub struct PollSession<'a, S: ResultSource> {
    source: &'a S,
    config: PollerConfig,
    cancel: CancellationToken,
}

impl<'a, S: ResultSource> PollSession<'a, S> {
    pub fn new(source: &'a S, config: PollerConfig) -> Self {
        Self {
            source,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that ends the session at the next delay boundary when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the session to a terminal state.
    ///
    /// Ok(report) with state Completed or Abandoned; Err only for fatal
    /// conditions (remote failure, unrecognized payload, persistence
    /// failure). Abandonment is an outcome, not an error: the job may still
    /// finish server-side and can be retried with the same identifier.
    pub async fn run(&self, job_id: &str) -> Result<SessionReport> {
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for ordinal in 1..=self.config.max_attempts {
            if self.cancel.is_cancelled() {
                info!("Session cancelled before attempt {}", ordinal);
                break;
            }

            // Delay strictly between attempts; the first poll goes out
            // immediately.
            let mut waited = Duration::ZERO;
            if ordinal > 1 {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        info!("Session cancelled while waiting for attempt {}", ordinal);
                        break;
                    }
                    _ = sleep(self.config.interval) => {
                        waited = self.config.interval;
                    }
                }
            }

            match self.source.poll(job_id, self.config.accept).await {
                Ok(PollOutcome::Ready(payload)) => {
                    info!(
                        "Job {} ready on attempt {}/{}",
                        job_id, ordinal, self.config.max_attempts
                    );
                    attempts.push(AttemptRecord {
                        ordinal,
                        waited,
                        outcome: AttemptOutcome::Ready,
                    });
                    let saved = save_payload(
                        &self.config.output_dir,
                        job_id,
                        &payload,
                        self.config.output_format,
                    )?;
                    return Ok(SessionReport {
                        job_id: job_id.to_string(),
                        state: JobState::Completed,
                        attempts,
                        saved,
                    });
                }
                Ok(PollOutcome::Pending) => {
                    info!(
                        "Job {} still processing (attempt {}/{})",
                        job_id, ordinal, self.config.max_attempts
                    );
                    attempts.push(AttemptRecord {
                        ordinal,
                        waited,
                        outcome: AttemptOutcome::Pending,
                    });
                }
                Ok(PollOutcome::NotFound) => {
                    // New jobs surface at the result endpoint eventually;
                    // not-found is bounded by the attempt budget like any
                    // other pending answer.
                    info!(
                        "Job {} not visible yet (attempt {}/{})",
                        job_id, ordinal, self.config.max_attempts
                    );
                    attempts.push(AttemptRecord {
                        ordinal,
                        waited,
                        outcome: AttemptOutcome::NotFound,
                    });
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        "Attempt {}/{} for job {} failed: {}",
                        ordinal, self.config.max_attempts, job_id, e
                    );
                    attempts.push(AttemptRecord {
                        ordinal,
                        waited,
                        outcome: AttemptOutcome::Error(e.to_string()),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            "Giving up on job {} after {} attempts; it may still complete server-side",
            job_id,
            attempts.len()
        );
        Ok(SessionReport {
            job_id: job_id.to_string(),
            state: JobState::Abandoned,
            attempts,
            saved: Vec::new(),
        })
    }
}
