//! Whole-job retry around submit and poll.

use super::classify::{PhraseClassifier, TransientClassifier};
use super::clock::{Sleeper, TokioSleeper};
use super::poller::{PollOutcome, Poller};
use crate::client::{GenerationRequest, InferenceClient, JobHandle, Rejection};
use crate::config::{AtelierConfig, PollConfig, RetryConfig};
use crate::core::Artifact;
use crate::errors::AtelierError;
use crate::events::{
    EventSink, NoOpEventSink, JOB_FAILED, JOB_RETRY_SCHEDULED, JOB_SUBMITTED, JOB_SUCCEEDED,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// One logical generation and its attempt counter.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    /// What to generate.
    pub request: GenerationRequest,
    /// Handle of the current attempt, once accepted.
    pub handle: Option<JobHandle>,
    /// Zero-based attempt number.
    pub attempt: u32,
}

impl GenerationJob {
    /// Creates a job that has not been submitted yet.
    #[must_use]
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            request,
            handle: None,
            attempt: 0,
        }
    }
}

/// Why an attempt did not produce an artifact.
enum AttemptError {
    /// Submission refused.
    Submit(Rejection),
    /// Accepted, then failed or could not be checked.
    Poll(Rejection),
    /// Terminal, not worth classifying.
    Fatal(AtelierError),
}

/// Runs a generation to completion, resubmitting the whole job on transient
/// provider failure.
///
/// A resubmission never resumes the earlier handle; it issues a fresh submit
/// with the same input. Submit-time and poll-time transient failures draw on
/// the same budget: `max_retries` resubmissions after the initial one, each
/// preceded by the next delay from the backoff schedule.
pub struct RetryingJobRunner {
    client: Arc<dyn InferenceClient>,
    poller: Poller,
    retry: RetryConfig,
    classifier: Arc<dyn TransientClassifier>,
    sleeper: Arc<dyn Sleeper>,
    events: Arc<dyn EventSink>,
}

impl RetryingJobRunner {
    /// Creates a runner with the default classifier and the tokio clock.
    #[must_use]
    pub fn new(client: Arc<dyn InferenceClient>, retry: RetryConfig, poll: PollConfig) -> Self {
        Self {
            poller: Poller::new(client.clone(), poll),
            client,
            retry,
            classifier: Arc::new(PhraseClassifier::default()),
            sleeper: Arc::new(TokioSleeper),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Creates a runner from a full configuration.
    #[must_use]
    pub fn from_config(client: Arc<dyn InferenceClient>, config: &AtelierConfig) -> Self {
        Self::new(client, config.retry.clone(), config.poll.clone())
    }

    /// Replaces the transient-failure classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn TransientClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replaces the clock for both backoff and polling.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.poller = self.poller.with_sleeper(sleeper.clone());
        self.sleeper = sleeper;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The retry configuration.
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// The event sink, shared with the fan-out coordinator and pipeline.
    #[must_use]
    pub fn event_sink(&self) -> Arc<dyn EventSink> {
        self.events.clone()
    }

    /// Runs `request` until it yields an artifact or fails fatally.
    pub async fn run(&self, request: GenerationRequest) -> Result<Artifact, AtelierError> {
        let span = info_span!(
            "generation_job",
            kind = %request.kind,
            fingerprint = %request.fingerprint()
        );
        self.run_job(GenerationJob::new(request)).instrument(span).await
    }

    async fn run_job(&self, mut job: GenerationJob) -> Result<Artifact, AtelierError> {
        loop {
            let rejection = match self.attempt(&mut job).await {
                Ok(artifact) => {
                    info!(attempt = job.attempt, url = %artifact.url, "Generation succeeded");
                    self.events.emit(
                        JOB_SUCCEEDED,
                        json!({"attempt": job.attempt, "url": artifact.url}),
                    );
                    return Ok(artifact);
                }
                Err(AttemptError::Fatal(err)) => return Err(self.fail(&job, err)),
                Err(AttemptError::Submit(rejection) | AttemptError::Poll(rejection))
                    if self.is_transient(&rejection) =>
                {
                    rejection
                }
                Err(AttemptError::Submit(rejection)) => {
                    let err = AtelierError::Rejected {
                        message: rejection.message,
                        transient: false,
                    };
                    return Err(self.fail(&job, err));
                }
                Err(AttemptError::Poll(rejection)) => {
                    return Err(self.fail(&job, AtelierError::ProviderFailed(rejection.message)));
                }
            };

            if job.attempt >= self.retry.max_retries {
                let err = AtelierError::RetriesExhausted {
                    attempts: job.attempt + 1,
                    last_error: rejection.message,
                };
                return Err(self.fail(&job, err));
            }

            let delay = self.retry.delay_for_attempt(job.attempt);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            warn!(
                delay_ms,
                error = %rejection,
                "Provider busy, retrying in {}s (attempt {}/{})",
                delay.as_secs(),
                job.attempt + 1,
                self.retry.max_retries
            );
            self.events.emit(
                JOB_RETRY_SCHEDULED,
                json!({
                    "attempt": job.attempt + 1,
                    "delay_ms": delay_ms,
                    "error": rejection.message,
                }),
            );

            self.sleeper.sleep(delay).await;
            job.attempt += 1;
            job.handle = None;
        }
    }

    async fn attempt(&self, job: &mut GenerationJob) -> Result<Artifact, AttemptError> {
        let handle = self
            .client
            .submit(&job.request)
            .await
            .map_err(AttemptError::Submit)?;

        info!(job = %handle, attempt = job.attempt, "Job submitted");
        self.events.emit(
            JOB_SUBMITTED,
            json!({"job": handle.id(), "attempt": job.attempt, "kind": job.request.kind}),
        );
        job.handle = Some(handle.clone());

        match self.poller.poll(&handle, job.request.kind).await {
            PollOutcome::Succeeded {
                artifact_url: Some(url),
            } => Ok(Artifact::new(url, job.request.kind)),
            PollOutcome::Succeeded { artifact_url: None } => {
                Err(AttemptError::Fatal(AtelierError::EmptyOutput))
            }
            PollOutcome::Failed(rejection) => Err(AttemptError::Poll(rejection)),
            PollOutcome::TimedOut { checks } => Err(AttemptError::Fatal(AtelierError::TimedOut {
                kind: job.request.kind,
                checks,
            })),
        }
    }

    fn is_transient(&self, rejection: &Rejection) -> bool {
        (rejection.transport && self.retry.retry_transport_errors)
            || self.classifier.is_transient(&rejection.message)
    }

    fn fail(&self, job: &GenerationJob, err: AtelierError) -> AtelierError {
        warn!(attempt = job.attempt, error = %err, "Generation failed");
        self.events.emit(
            JOB_FAILED,
            json!({
                "attempt": job.attempt,
                "job": job.handle.as_ref().map(JobHandle::id),
                "error": err.to_string(),
            }),
        );
        err
    }
}

impl std::fmt::Debug for RetryingJobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingJobRunner")
            .field("poller", &self.poller)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockInferenceClient, StatusReport};
    use crate::core::JobKind;
    use crate::events::CollectingEventSink;
    use crate::testing::{RecordingSleeper, ScriptedClient};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn runner(client: Arc<dyn InferenceClient>, sleeper: &Arc<RecordingSleeper>) -> RetryingJobRunner {
        RetryingJobRunner::new(client, RetryConfig::default(), PollConfig::default())
            .with_sleeper(sleeper.clone())
    }

    fn request() -> GenerationRequest {
        GenerationRequest::image(json!({"prompt": "wool coat"}))
    }

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let client = Arc::new(ScriptedClient::new());
        let sleeper = Arc::new(RecordingSleeper::new());

        let artifact = runner(client.clone(), &sleeper).run(request()).await.unwrap();

        assert_eq!(artifact.url, "https://cdn.example/job-1.jpg");
        assert_eq!(artifact.kind, JobKind::Image);
        assert_eq!(client.submit_count(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_transient_poll_failure_resubmits_then_succeeds() {
        // First two jobs fail with E003, the third succeeds.
        let client = Arc::new(ScriptedClient::new().on_status(|handle, _| {
            if handle.id() == "job-3" {
                Ok(StatusReport::succeeded("https://cdn.example/ok.jpg"))
            } else {
                Ok(StatusReport::failed("Prediction interrupted; please retry (code: E003)"))
            }
        }));
        let sleeper = Arc::new(RecordingSleeper::new());

        let artifact = runner(client.clone(), &sleeper).run(request()).await.unwrap();

        assert_eq!(artifact.url, "https://cdn.example/ok.jpg");
        assert_eq!(client.submit_count(), 3);
        assert_eq!(sleeper.delays(), secs(&[5, 10]));

        let submitted = client.submitted();
        assert!(submitted.iter().all(|r| *r == request()));
    }

    #[tokio::test]
    async fn test_retries_exhausted_after_full_schedule() {
        let client = Arc::new(
            ScriptedClient::new()
                .on_status(|_, _| Ok(StatusReport::failed("Service is currently unavailable"))),
        );
        let sleeper = Arc::new(RecordingSleeper::new());

        let err = runner(client.clone(), &sleeper).run(request()).await.unwrap_err();

        match err {
            AtelierError::RetriesExhausted { attempts, last_error } => {
                assert_eq!(attempts, 5);
                assert_eq!(last_error, "Service is currently unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client.submit_count(), 5);
        assert_eq!(sleeper.delays(), secs(&[5, 10, 20, 40]));
    }

    #[tokio::test]
    async fn test_submit_and_poll_failures_share_budget() {
        // Submissions 1 and 3 are refused as unavailable, 2 and 4 fail while
        // polling, 5 succeeds.
        let client = Arc::new(
            ScriptedClient::new()
                .on_submit(|_, n| {
                    if n % 2 == 1 && n < 5 {
                        Err(Rejection::provider("API Error: 503 - E003"))
                    } else {
                        Ok(JobHandle::new(format!("job-{n}")))
                    }
                })
                .on_status(|handle, _| {
                    if handle.id() == "job-5" {
                        Ok(StatusReport::succeeded("https://cdn.example/final.jpg"))
                    } else {
                        Ok(StatusReport::failed("currently unavailable"))
                    }
                }),
        );
        let sleeper = Arc::new(RecordingSleeper::new());

        let artifact = runner(client.clone(), &sleeper).run(request()).await.unwrap();

        assert_eq!(artifact.url, "https://cdn.example/final.jpg");
        assert_eq!(client.submit_count(), 5);
        assert_eq!(sleeper.delays(), secs(&[5, 10, 20, 40]));
    }

    #[tokio::test]
    async fn test_non_transient_poll_failure_is_not_retried() {
        let client = Arc::new(
            ScriptedClient::new().on_status(|_, _| Ok(StatusReport::failed("NSFW content detected"))),
        );
        let sleeper = Arc::new(RecordingSleeper::new());

        let err = runner(client.clone(), &sleeper).run(request()).await.unwrap_err();

        assert!(matches!(err, AtelierError::ProviderFailed(ref m) if m == "NSFW content detected"));
        assert_eq!(client.submit_count(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_non_transient_submit_rejection() {
        let client = Arc::new(
            ScriptedClient::new()
                .on_submit(|_, _| Err(Rejection::provider("API Error: 422 - invalid input"))),
        );
        let sleeper = Arc::new(RecordingSleeper::new());

        let err = runner(client.clone(), &sleeper).run(request()).await.unwrap_err();

        assert!(matches!(
            err,
            AtelierError::Rejected { transient: false, ref message } if message == "API Error: 422 - invalid input"
        ));
        assert_eq!(client.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_follow_config() {
        let script = || {
            ScriptedClient::new().on_submit(|_, n| {
                if n == 1 {
                    Err(Rejection::transport("Request Error: connection reset"))
                } else {
                    Ok(JobHandle::new(format!("job-{n}")))
                }
            })
        };
        let sleeper = Arc::new(RecordingSleeper::new());

        let client = Arc::new(script());
        let artifact = runner(client.clone(), &sleeper).run(request()).await.unwrap();
        assert_eq!(artifact.url, "https://cdn.example/job-2.jpg");

        let client = Arc::new(script());
        let strict = RetryingJobRunner::new(
            client.clone(),
            RetryConfig::default().with_retry_transport_errors(false),
            PollConfig::default(),
        )
        .with_sleeper(sleeper.clone());
        let err = strict.run(request()).await.unwrap_err();
        assert!(matches!(err, AtelierError::Rejected { transient: false, .. }));
        assert_eq!(client.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let client = Arc::new(ScriptedClient::new().on_status(|_, _| Ok(StatusReport::processing())));
        let sleeper = Arc::new(RecordingSleeper::new());

        let err = runner(client.clone(), &sleeper).run(request()).await.unwrap_err();

        assert!(matches!(
            err,
            AtelierError::TimedOut {
                kind: JobKind::Image,
                checks: 60
            }
        ));
        assert_eq!(client.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_output() {
        let client = Arc::new(
            ScriptedClient::new().on_status(|_, _| Ok(StatusReport::with_status("succeeded"))),
        );
        let sleeper = Arc::new(RecordingSleeper::new());

        let err = runner(client, &sleeper).run(request()).await.unwrap_err();
        assert!(matches!(err, AtelierError::EmptyOutput));
    }

    #[tokio::test]
    async fn test_custom_classifier() {
        let client = Arc::new(ScriptedClient::new().on_status(|handle, _| {
            if handle.id() == "job-1" {
                Ok(StatusReport::failed("rate limited"))
            } else {
                Ok(StatusReport::succeeded("https://cdn.example/x.jpg"))
            }
        }));
        let sleeper = Arc::new(RecordingSleeper::new());

        let artifact = runner(client.clone(), &sleeper)
            .with_classifier(Arc::new(PhraseClassifier::new(["rate limited"])))
            .run(request())
            .await
            .unwrap();
        assert_eq!(artifact.url, "https://cdn.example/x.jpg");
        assert_eq!(client.submit_count(), 2);
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let client = Arc::new(ScriptedClient::new().on_status(|handle, _| {
            if handle.id() == "job-1" {
                Ok(StatusReport::failed("E003"))
            } else {
                Ok(StatusReport::succeeded("https://cdn.example/x.jpg"))
            }
        }));
        let sleeper = Arc::new(RecordingSleeper::new());
        let sink = Arc::new(CollectingEventSink::new());

        runner(client, &sleeper)
            .with_event_sink(sink.clone())
            .run(request())
            .await
            .unwrap();

        assert_eq!(sink.events_of_type(JOB_SUBMITTED).len(), 2);
        let retries = sink.events_of_type(JOB_RETRY_SCHEDULED);
        assert_eq!(retries.len(), 1);
        assert_eq!(retries[0]["delay_ms"], 5000);
        assert_eq!(sink.events_of_type(JOB_SUCCEEDED).len(), 1);
        assert!(sink.events_of_type(JOB_FAILED).is_empty());
    }

    #[tokio::test]
    async fn test_with_mock_client() {
        let mut mock = MockInferenceClient::new();
        mock.expect_submit()
            .times(1)
            .returning(|_| Ok(JobHandle::new("pred-abc")));
        mock.expect_status()
            .withf(|handle| handle.id() == "pred-abc")
            .times(1)
            .returning(|_| Ok(StatusReport::succeeded("https://cdn.example/video.mp4")));

        let sleeper = Arc::new(RecordingSleeper::new());
        let artifact = runner(Arc::new(mock), &sleeper)
            .run(GenerationRequest::video(json!({"prompt": "runway walk"})))
            .await
            .unwrap();

        assert_eq!(artifact.kind, JobKind::Video);
        assert_eq!(artifact.url, "https://cdn.example/video.mp4");
    }
}
