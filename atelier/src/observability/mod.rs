//! Tracing subscriber setup.
//!
//! The library only emits through `tracing`; binaries and tests that want to
//! see the output install a subscriber once with `init_tracing`.

use crate::errors::AtelierError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per line, with span fields.
    Json,
}

impl LogFormat {
    /// Parses `compact` or `json`, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Reads `ATELIER_LOG_FORMAT`, defaulting to compact.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("ATELIER_LOG_FORMAT")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Installs the global subscriber. Respects `RUST_LOG`.
///
/// # Errors
///
/// Returns `AtelierError::Config` if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<(), AtelierError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Compact => registry
            .with(fmt::layer().with_target(false).compact())
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init(),
    };

    result.map_err(|e| AtelierError::Config(format!("failed to install tracing subscriber: {e}")))
}
