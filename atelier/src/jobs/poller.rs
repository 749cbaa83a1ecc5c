//! Status polling for one accepted job.

use super::clock::{Sleeper, TokioSleeper};
use crate::client::{InferenceClient, JobHandle, Rejection};
use crate::config::PollConfig;
use crate::core::{JobKind, PredictionStatus};
use std::sync::Arc;
use tracing::debug;

/// Check counter for one job handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    /// Status checks performed so far.
    pub elapsed_checks: u32,
    /// Ceiling for this job's kind.
    pub max_checks: u32,
}

impl PollState {
    /// Creates a fresh state.
    #[must_use]
    pub fn new(max_checks: u32) -> Self {
        Self {
            elapsed_checks: 0,
            max_checks,
        }
    }

    /// Returns true once the ceiling has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.elapsed_checks >= self.max_checks
    }
}

/// How polling ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job succeeded. The URL is absent if the provider returned no output.
    Succeeded {
        /// The artifact URL.
        artifact_url: Option<String>,
    },
    /// The job failed, an unknown status came back, or a status check itself
    /// could not be made.
    Failed(Rejection),
    /// The ceiling was reached without a terminal status.
    TimedOut {
        /// Checks performed.
        checks: u32,
    },
}

/// Checks a job's status on a fixed interval until it settles.
///
/// The poller never resubmits; that belongs to the job runner.
#[derive(Clone)]
pub struct Poller {
    client: Arc<dyn InferenceClient>,
    config: PollConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl Poller {
    /// Creates a poller that sleeps on the tokio timer.
    #[must_use]
    pub fn new(client: Arc<dyn InferenceClient>, config: PollConfig) -> Self {
        Self {
            client,
            config,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The poll configuration.
    #[must_use]
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Polls `handle` until it succeeds, fails or runs out of checks.
    pub async fn poll(&self, handle: &JobHandle, kind: JobKind) -> PollOutcome {
        let mut state = PollState::new(self.config.max_checks(kind));

        loop {
            if state.is_exhausted() {
                return PollOutcome::TimedOut {
                    checks: state.elapsed_checks,
                };
            }

            let report = match self.client.status(handle).await {
                Ok(report) => report,
                Err(rejection) => return PollOutcome::Failed(rejection),
            };
            state.elapsed_checks += 1;

            match report.status {
                PredictionStatus::Succeeded => {
                    return PollOutcome::Succeeded {
                        artifact_url: report.artifact_url(),
                    };
                }
                PredictionStatus::Failed => {
                    let message = report.error.unwrap_or_default();
                    return PollOutcome::Failed(Rejection::provider(message));
                }
                PredictionStatus::Starting | PredictionStatus::Processing => {
                    debug!(
                        job = %handle,
                        status = %report.status,
                        check = state.elapsed_checks,
                        max_checks = state.max_checks,
                        "Job still running"
                    );
                    if state.is_exhausted() {
                        return PollOutcome::TimedOut {
                            checks: state.elapsed_checks,
                        };
                    }
                    self.sleeper.sleep(self.config.interval()).await;
                }
                PredictionStatus::Unknown(raw) => {
                    return PollOutcome::Failed(Rejection::provider(format!(
                        "Unknown status: {raw}"
                    )));
                }
            }
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
