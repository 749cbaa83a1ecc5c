//! Configuration for the provider, the retry budget and polling.
//!
//! All timing constants live here rather than in the runner or poller so
//! tests can compress them.

use crate::core::JobKind;
use crate::errors::AtelierError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whole-job retry budget and backoff schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Resubmissions allowed after the initial submission.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before each resubmission, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,
    /// Whether transport failures (connection reset, DNS, ...) share the
    /// transient retry path.
    #[serde(default = "default_true")]
    pub retry_transport_errors: bool,
}

fn default_max_retries() -> u32 {
    4
}

fn default_backoff_ms() -> Vec<u64> {
    vec![5_000, 10_000, 20_000, 40_000]
}

fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            retry_transport_errors: default_true(),
        }
    }
}

impl RetryConfig {
    /// Creates a retry config with the default schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of resubmissions.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the backoff schedule.
    #[must_use]
    pub fn with_backoff_ms(mut self, schedule: Vec<u64>) -> Self {
        self.backoff_ms = schedule;
        self
    }

    /// Sets whether transport failures are retried.
    #[must_use]
    pub fn with_retry_transport_errors(mut self, retry: bool) -> Self {
        self.retry_transport_errors = retry;
        self
    }

    /// Delay before resubmission number `attempt + 1`.
    ///
    /// Past the end of the schedule the last entry is reused.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let index = (attempt as usize).min(self.backoff_ms.len().saturating_sub(1));
        Duration::from_millis(self.backoff_ms.get(index).copied().unwrap_or(0))
    }
}

/// Status polling interval and per-kind check ceilings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status checks in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Check ceiling for image jobs (about 5 minutes).
    #[serde(default = "default_image_max_checks")]
    pub image_max_checks: u32,
    /// Check ceiling for video jobs (about 20 minutes).
    #[serde(default = "default_video_max_checks")]
    pub video_max_checks: u32,
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_image_max_checks() -> u32 {
    60
}

fn default_video_max_checks() -> u32 {
    240
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            image_max_checks: default_image_max_checks(),
            video_max_checks: default_video_max_checks(),
        }
    }
}

impl PollConfig {
    /// Creates a poll config with the default budgets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interval between checks.
    #[must_use]
    pub fn with_interval_ms(mut self, interval: u64) -> Self {
        self.interval_ms = interval;
        self
    }

    /// Check ceiling for the given kind.
    #[must_use]
    pub fn max_checks(&self, kind: JobKind) -> u32 {
        match kind {
            JobKind::Image => self.image_max_checks,
            JobKind::Video => self.video_max_checks,
        }
    }

    /// Interval as a `Duration`.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Remote inference endpoint settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API root, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token. Never serialized.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,
    /// Model used for image jobs.
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Model used for video jobs.
    #[serde(default = "default_video_model")]
    pub video_model: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.replicate.com/v1".to_string()
}

fn default_image_model() -> String {
    "google/nano-banana".to_string()
}

fn default_video_model() -> String {
    "google/veo-3.1".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            image_model: default_image_model(),
            video_model: default_video_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("image_model", &self.image_model)
            .field("video_model", &self.video_model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Report of which provider settings are in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvCheck {
    /// Whether a token is configured.
    pub token_configured: bool,
    /// Image model in use.
    pub image_model: String,
    /// Video model in use.
    pub video_model: String,
}

impl ProviderConfig {
    /// Creates a provider config with defaults and no token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads settings from the environment.
    ///
    /// `ATELIER_API_TOKEN` (or `REPLICATE_API_TOKEN`), `ATELIER_IMAGE_MODEL`
    /// (or `MODEL_ID`), `ATELIER_VIDEO_MODEL` and `ATELIER_BASE_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let mut config = Self::default();
        config.api_token = first(&["ATELIER_API_TOKEN", "REPLICATE_API_TOKEN"]);
        if let Some(model) = first(&["ATELIER_IMAGE_MODEL", "MODEL_ID"]) {
            config.image_model = model;
        }
        if let Some(model) = first(&["ATELIER_VIDEO_MODEL"]) {
            config.video_model = model;
        }
        if let Some(url) = first(&["ATELIER_BASE_URL"]) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        config
    }

    /// Sets the token.
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Sets the API root.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Model for the given kind.
    #[must_use]
    pub fn model_for(&self, kind: JobKind) -> &str {
        match kind {
            JobKind::Image => &self.image_model,
            JobKind::Video => &self.video_model,
        }
    }

    /// HTTP timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the token or a configuration error.
    pub fn require_token(&self) -> Result<&str, AtelierError> {
        self.api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AtelierError::Config("API token not configured".to_string()))
    }

    /// Summarizes the configuration without exposing the token.
    #[must_use]
    pub fn env_check(&self) -> EnvCheck {
        EnvCheck {
            token_configured: self.require_token().is_ok(),
            image_model: self.image_model.clone(),
            video_model: self.video_model.clone(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtelierConfig {
    /// Provider endpoint.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Retry budget.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Poll budget.
    #[serde(default)]
    pub poll: PollConfig,
}

impl AtelierConfig {
    /// Parses configuration from JSON, filling in defaults.
    pub fn from_json(raw: &str) -> Result<Self, AtelierError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Defaults plus provider settings from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            provider: ProviderConfig::from_env(),
            ..Self::default()
        }
    }
}
