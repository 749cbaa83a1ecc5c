//! Concurrent fan-out over independent generation jobs.

use super::runner::RetryingJobRunner;
use crate::client::GenerationRequest;
use crate::core::Artifact;
use crate::errors::AtelierError;
use crate::events::{FANOUT_COMPLETED, FANOUT_SLOT_FAILED};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// The settled result of one request in a batch.
#[derive(Debug, Clone)]
pub struct FanOutSlot {
    /// Position of the request in the batch.
    pub index: usize,
    /// The artifact, if the job succeeded.
    pub artifact: Option<Artifact>,
    /// The error message, if it failed.
    pub error: Option<String>,
}

impl FanOutSlot {
    fn settled(index: usize, result: Result<Artifact, AtelierError>) -> Self {
        match result {
            Ok(artifact) => Self {
                index,
                artifact: Some(artifact),
                error: None,
            },
            Err(err) => Self {
                index,
                artifact: None,
                error: Some(err.to_string()),
            },
        }
    }

    /// Whether this slot produced an artifact.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.artifact.is_some()
    }
}

/// Every slot of a settled batch, in request order.
#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
    /// One entry per request.
    pub slots: Vec<FanOutSlot>,
}

impl FanOutReport {
    /// Successful slots with their request index, in request order.
    pub fn successes(&self) -> impl Iterator<Item = (usize, &Artifact)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.artifact.as_ref().map(|a| (slot.index, a)))
    }

    /// Number of successful slots.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_success()).count()
    }

    /// Failed slots with their error message, in request order.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.error.as_deref().map(|e| (slot.index, e)))
    }
}

/// Runs a batch of requests concurrently and keeps the partial result.
///
/// Every job runs independently through the retrying runner. The batch only
/// fails when no job succeeds.
#[derive(Debug, Clone)]
pub struct FanOutCoordinator {
    runner: Arc<RetryingJobRunner>,
}

impl FanOutCoordinator {
    /// Creates a coordinator over a shared runner.
    #[must_use]
    pub fn new(runner: Arc<RetryingJobRunner>) -> Self {
        Self { runner }
    }

    /// Runs every request and waits for all of them to settle.
    ///
    /// # Errors
    ///
    /// Returns `AtelierError::NoResults` if the batch is empty or every job
    /// failed. Individual failures are otherwise reported in the slots.
    pub async fn run_all(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Result<FanOutReport, AtelierError> {
        let attempted = requests.len();
        let events = self.runner.event_sink();

        let settled = join_all(
            requests
                .into_iter()
                .map(|request| self.runner.run(request)),
        )
        .await;

        let slots: Vec<FanOutSlot> = settled
            .into_iter()
            .enumerate()
            .map(|(index, result)| FanOutSlot::settled(index, result))
            .collect();
        let report = FanOutReport { slots };

        for (index, message) in report.failures() {
            error!(slot = index, error = %message, "Fan-out job failed");
            events.emit(FANOUT_SLOT_FAILED, json!({"slot": index, "error": message}));
        }

        let succeeded = report.success_count();
        info!(attempted, succeeded, "Fan-out settled");
        events.emit(
            FANOUT_COMPLETED,
            json!({"attempted": attempted, "succeeded": succeeded}),
        );

        if succeeded == 0 {
            return Err(AtelierError::NoResults {
                attempted,
                errors: report.failures().map(|(_, e)| e.to_string()).collect(),
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{JobHandle, StatusReport};
    use crate::config::{PollConfig, RetryConfig};
    use crate::events::CollectingEventSink;
    use crate::testing::{RecordingSleeper, ScriptedClient};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn coordinator(client: Arc<ScriptedClient>, sink: Arc<CollectingEventSink>) -> FanOutCoordinator {
        let runner = RetryingJobRunner::new(client, RetryConfig::default(), PollConfig::default())
            .with_sleeper(Arc::new(RecordingSleeper::new()))
            .with_event_sink(sink);
        FanOutCoordinator::new(Arc::new(runner))
    }

    fn requests(n: usize) -> Vec<GenerationRequest> {
        (0..n)
            .map(|i| GenerationRequest::image(json!({"prompt": format!("angle {i}")})))
            .collect()
    }

    /// Handles are named after the request prompt so results can be matched
    /// regardless of submission order.
    fn by_prompt() -> ScriptedClient {
        ScriptedClient::new().on_submit(|request, _| {
            let prompt = request.input["prompt"].as_str().unwrap_or_default();
            Ok(JobHandle::new(prompt.replace(' ', "-")))
        })
    }

    #[tokio::test]
    async fn test_partial_success_keeps_order() {
        let client = Arc::new(by_prompt().on_status(|handle, _| {
            if handle.id() == "angle-2" {
                Ok(StatusReport::failed("NSFW content detected"))
            } else {
                Ok(StatusReport::succeeded(format!("https://cdn.example/{handle}.jpg")))
            }
        }));
        let sink = Arc::new(CollectingEventSink::new());

        let report = coordinator(client, sink.clone()).run_all(requests(6)).await.unwrap();

        assert_eq!(report.slots.len(), 6);
        assert_eq!(report.success_count(), 5);
        let indexes: Vec<usize> = report.successes().map(|(i, _)| i).collect();
        assert_eq!(indexes, vec![0, 1, 3, 4, 5]);
        assert_eq!(
            report.slots[4].artifact.as_ref().map(|a| a.url.as_str()),
            Some("https://cdn.example/angle-4.jpg")
        );

        let failures: Vec<(usize, &str)> = report.failures().collect();
        assert_eq!(failures, vec![(2, "Prediction failed: NSFW content detected")]);
        assert_eq!(sink.events_of_type(FANOUT_SLOT_FAILED).len(), 1);
        assert_eq!(
            sink.events_of_type(FANOUT_COMPLETED),
            vec![json!({"attempted": 6, "succeeded": 5})]
        );
    }

    #[tokio::test]
    async fn test_all_failed_is_no_results() {
        let client = Arc::new(
            by_prompt().on_status(|_, _| Ok(StatusReport::failed("input image is invalid"))),
        );
        let sink = Arc::new(CollectingEventSink::new());

        let err = coordinator(client, sink).run_all(requests(3)).await.unwrap_err();

        match err {
            AtelierError::NoResults { attempted, errors } => {
                assert_eq!(attempted, 3);
                assert_eq!(errors.len(), 3);
                assert!(errors.iter().all(|e| e.contains("input image is invalid")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slots_retry_independently() {
        // Only angle-1 hits a transient failure on its first check.
        let client = Arc::new(by_prompt().on_status(|handle, n| {
            if handle.id() == "angle-1" && n == 1 {
                Ok(StatusReport::failed("E003"))
            } else {
                Ok(StatusReport::succeeded(format!("https://cdn.example/{handle}.jpg")))
            }
        }));
        let sink = Arc::new(CollectingEventSink::new());

        let report = coordinator(client.clone(), sink).run_all(requests(3)).await.unwrap();

        assert_eq!(report.success_count(), 3);
        assert_eq!(client.submit_count(), 4);
    }

    #[tokio::test]
    async fn test_jobs_are_in_flight_together() {
        let submitted = Arc::new(AtomicUsize::new(0));
        let seen_at_first_check = Arc::new(Mutex::new(None));

        let counter = submitted.clone();
        let seen = seen_at_first_check.clone();
        let client = Arc::new(
            ScriptedClient::new()
                .on_submit(move |_, n| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(JobHandle::new(format!("job-{n}")))
                })
                .on_status(move |handle, _| {
                    let mut first = seen.lock();
                    if first.is_none() {
                        *first = Some(submitted.load(Ordering::SeqCst));
                    }
                    Ok(StatusReport::succeeded(format!("https://cdn.example/{handle}.jpg")))
                }),
        );
        let sink = Arc::new(CollectingEventSink::new());

        let report = coordinator(client, sink).run_all(requests(6)).await.unwrap();

        assert_eq!(report.success_count(), 6);
        assert_eq!(*seen_at_first_check.lock(), Some(6));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let client = Arc::new(ScriptedClient::new());
        let sink = Arc::new(CollectingEventSink::new());

        let err = coordinator(client, sink).run_all(Vec::new()).await.unwrap_err();
        assert!(matches!(err, AtelierError::NoResults { attempted: 0, .. }));
    }
}
