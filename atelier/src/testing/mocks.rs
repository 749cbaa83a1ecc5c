//! Scripted provider and clock doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::client::{GenerationRequest, InferenceClient, JobHandle, Rejection, StatusReport};
use crate::jobs::Sleeper;

type SubmitFn = dyn Fn(&GenerationRequest, u32) -> Result<JobHandle, Rejection> + Send + Sync;
type StatusFn = dyn Fn(&JobHandle, u32) -> Result<StatusReport, Rejection> + Send + Sync;

/// An `InferenceClient` driven by closures.
///
/// The submit closure receives the request and the 1-based submission number
/// across the whole client. The status closure receives the handle and the
/// 1-based check number for that handle. Every submit yields once before
/// returning, so concurrent jobs interleave as they would over a network.
/// By default every submission is accepted as `job-N` and every first check
/// succeeds with `https://cdn.example/job-N.jpg`.
pub struct ScriptedClient {
    on_submit: Box<SubmitFn>,
    on_status: Box<StatusFn>,
    submits: Mutex<Vec<GenerationRequest>>,
    checks: Mutex<HashMap<String, u32>>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedClient {
    /// Creates a client that accepts everything and succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            on_submit: Box::new(|_: &GenerationRequest, n: u32| {
                Ok(JobHandle::new(format!("job-{n}")))
            }),
            on_status: Box::new(|handle: &JobHandle, _: u32| {
                Ok(StatusReport::succeeded(format!("https://cdn.example/{handle}.jpg")))
            }),
            submits: Mutex::new(Vec::new()),
            checks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a client whose jobs succeed with `{prefix}/{handle}`.
    #[must_use]
    pub fn succeeding(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new().on_status(move |handle, _| {
            Ok(StatusReport::succeeded(format!("{prefix}/{handle}")))
        })
    }

    /// Scripts the submit call.
    #[must_use]
    pub fn on_submit<F>(mut self, f: F) -> Self
    where
        F: Fn(&GenerationRequest, u32) -> Result<JobHandle, Rejection> + Send + Sync + 'static,
    {
        self.on_submit = Box::new(f);
        self
    }

    /// Scripts the status call.
    #[must_use]
    pub fn on_status<F>(mut self, f: F) -> Self
    where
        F: Fn(&JobHandle, u32) -> Result<StatusReport, Rejection> + Send + Sync + 'static,
    {
        self.on_status = Box::new(f);
        self
    }

    /// Number of submit calls made.
    #[must_use]
    pub fn submit_count(&self) -> usize {
        self.submits.lock().len()
    }

    /// Every submitted request, in call order.
    #[must_use]
    pub fn submitted(&self) -> Vec<GenerationRequest> {
        self.submits.lock().clone()
    }

    /// Number of status checks made for one job id.
    #[must_use]
    pub fn status_count(&self, job_id: &str) -> u32 {
        self.checks.lock().get(job_id).copied().unwrap_or(0)
    }

    /// Number of status checks made across all jobs.
    #[must_use]
    pub fn total_status_count(&self) -> u32 {
        self.checks.lock().values().sum()
    }
}

impl std::fmt::Debug for ScriptedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedClient")
            .field("submits", &self.submit_count())
            .field("checks", &self.total_status_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, Rejection> {
        let n = {
            let mut submits = self.submits.lock();
            submits.push(request.clone());
            submits.len()
        };
        let result = (self.on_submit)(request, u32::try_from(n).unwrap_or(u32::MAX));
        tokio::task::yield_now().await;
        result
    }

    async fn status(&self, handle: &JobHandle) -> Result<StatusReport, Rejection> {
        let n = {
            let mut checks = self.checks.lock();
            let count = checks.entry(handle.id().to_string()).or_insert(0);
            *count += 1;
            *count
        };
        (self.on_status)(handle, n)
    }
}

/// A clock that records requested delays and returns at once.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every requested delay, in call order.
    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    /// Sum of all requested delays.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.delays.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_defaults() {
        let client = ScriptedClient::new();
        let handle = client
            .submit(&GenerationRequest::image(json!({"prompt": "coat"})))
            .await
            .unwrap();
        assert_eq!(handle.id(), "job-1");

        let report = client.status(&handle).await.unwrap();
        assert_eq!(report.artifact_url().as_deref(), Some("https://cdn.example/job-1.jpg"));
        assert_eq!(client.submit_count(), 1);
        assert_eq!(client.status_count("job-1"), 1);
    }

    #[tokio::test]
    async fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_secs(5)).await;
        sleeper.sleep(Duration::from_secs(10)).await;
        assert_eq!(sleeper.total(), Duration::from_secs(15));
        assert_eq!(sleeper.delays().len(), 2);
    }
}
