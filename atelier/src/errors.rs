//! Error types for atelier.
//!
//! Every failure surfaces to the caller as a single `AtelierError`. The
//! variants follow the failure taxonomy of the job runner: transient
//! overload (retried, surfaced only once the budget is spent), non-transient
//! provider failure, timeout, empty fan-out batch and precondition violations
//! that are rejected before any network call.

use crate::core::JobKind;
use serde::Serialize;
use thiserror::Error;

/// The main error type for atelier operations.
#[derive(Debug, Error)]
pub enum AtelierError {
    /// The provider refused the submission.
    #[error("Submission rejected: {message}")]
    Rejected {
        /// Raw provider or transport message.
        message: String,
        /// Whether the message was classified as transient.
        transient: bool,
    },

    /// The provider reported a non-transient failure.
    #[error("Prediction failed: {0}")]
    ProviderFailed(String),

    /// The provider stayed unavailable for the whole retry budget.
    #[error("Provider still unavailable after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Total submissions made.
        attempts: u32,
        /// Message from the last attempt.
        last_error: String,
    },

    /// No terminal status within the kind's check ceiling.
    #[error("Generation took too long: {kind} job still running after {checks} status checks")]
    TimedOut {
        /// Kind of the job that timed out.
        kind: JobKind,
        /// Status checks performed.
        checks: u32,
    },

    /// Every job in a fan-out batch failed.
    #[error("No results produced: all {attempted} jobs failed")]
    NoResults {
        /// Jobs in the batch.
        attempted: usize,
        /// Per-job error messages, in request order.
        errors: Vec<String>,
    },

    /// An operation was called in a state where it is not legal.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The provider reported success without an artifact.
    #[error("No artifact URL returned from provider")]
    EmptyOutput,

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error category, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Provider overload that outlived the retry budget.
    Transient,
    /// Provider or input failure.
    Provider,
    /// Took too long.
    Timeout,
    /// Every fan-out job failed.
    PartialBatch,
    /// Illegal call for the current state.
    Precondition,
    /// Local setup problem.
    Internal,
}

impl AtelierError {
    /// Creates a precondition error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Rejected { transient: true, .. } | Self::RetriesExhausted { .. } => {
                ErrorCategory::Transient
            }
            Self::Rejected { .. } | Self::ProviderFailed(_) | Self::EmptyOutput => {
                ErrorCategory::Provider
            }
            Self::TimedOut { .. } => ErrorCategory::Timeout,
            Self::NoResults { .. } => ErrorCategory::PartialBatch,
            Self::Precondition(_) => ErrorCategory::Precondition,
            Self::Config(_) | Self::Serialization(_) => ErrorCategory::Internal,
        }
    }

    /// Returns true if the error was raised before any network call.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Returns true if the job ran out of poll checks.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// The message surfaced to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
