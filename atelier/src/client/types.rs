//! Request and response types exchanged with the inference provider.

use crate::core::{JobKind, PredictionStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// One generation request: an opaque provider input plus its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Image or video; selects the model and the poll ceiling.
    pub kind: JobKind,
    /// Provider input body (prompt, reference images, format flags).
    pub input: serde_json::Value,
}

impl GenerationRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(kind: JobKind, input: serde_json::Value) -> Self {
        Self { kind, input }
    }

    /// Creates an image request.
    #[must_use]
    pub fn image(input: serde_json::Value) -> Self {
        Self::new(JobKind::Image, input)
    }

    /// Creates a video request.
    #[must_use]
    pub fn video(input: serde_json::Value) -> Self {
        Self::new(JobKind::Video, input)
    }

    /// Short, stable hash of the input used to correlate log lines.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.input.to_string().as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(12);
        hex
    }
}

/// Identifier of a job the provider accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    /// Wraps a provider job id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The provider job id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A refused call: the raw provider or transport message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Raw error text.
    pub message: String,
    /// True when the call never reached the provider (connect, DNS, reset).
    #[serde(default)]
    pub transport: bool,
}

impl Rejection {
    /// A rejection reported by the provider.
    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transport: false,
        }
    }

    /// A transport-level failure.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transport: true,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The provider's answer to a status check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Job status.
    pub status: PredictionStatus,
    /// Raw output: a URL string or an array of URL strings.
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    /// Provider error message for failed jobs.
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusReport {
    /// A report with only a status.
    #[must_use]
    pub fn with_status(status: impl Into<PredictionStatus>) -> Self {
        Self {
            status: status.into(),
            output: None,
            error: None,
        }
    }

    /// A `processing` report.
    #[must_use]
    pub fn processing() -> Self {
        Self::with_status(PredictionStatus::Processing)
    }

    /// A `succeeded` report carrying one URL.
    #[must_use]
    pub fn succeeded(url: impl Into<String>) -> Self {
        Self {
            status: PredictionStatus::Succeeded,
            output: Some(serde_json::Value::String(url.into())),
            error: None,
        }
    }

    /// A `failed` report carrying an error message.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: PredictionStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }

    /// The artifact URL: the output string, or the first string in an array.
    #[must_use]
    pub fn artifact_url(&self) -> Option<String> {
        match self.output.as_ref()? {
            serde_json::Value::String(url) if !url.is_empty() => Some(url.clone()),
            serde_json::Value::Array(items) => items
                .iter()
                .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
                .map(str::to_string),
            _ => None,
        }
    }
}
