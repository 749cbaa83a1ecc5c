//! Job kind and provider status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of artifact a generation job produces.
///
/// The kind selects the provider model and the poll ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// A still image (sketch, colored rendering, model photo, angle view).
    Image,
    /// A short video clip (runway walk).
    Video,
}

impl Default for JobKind {
    fn default() -> Self {
        Self::Image
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Status of a prediction as reported by the provider.
///
/// Anything outside the four known values is kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PredictionStatus {
    /// Accepted, not yet running.
    Starting,
    /// Running.
    Processing,
    /// Finished with an artifact.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// A status this crate does not understand.
    Unknown(String),
}

impl PredictionStatus {
    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true while the provider is still working on the job.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Starting | Self::Processing)
    }

    /// Returns the provider's wire name for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for PredictionStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "starting" => Self::Starting,
            "processing" => Self::Processing,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for PredictionStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<PredictionStatus> for String {
    fn from(status: PredictionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
