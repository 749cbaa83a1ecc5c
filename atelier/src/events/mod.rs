//! Lifecycle events for observability.
//!
//! The job runner, fan-out coordinator and pipeline report what they do
//! through an `EventSink`. Event names are the constants below.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A job was accepted by the provider.
pub const JOB_SUBMITTED: &str = "job.submitted";
/// A transient failure scheduled a whole-job resubmission.
pub const JOB_RETRY_SCHEDULED: &str = "job.retry_scheduled";
/// A job produced an artifact.
pub const JOB_SUCCEEDED: &str = "job.succeeded";
/// A job ended in a fatal error.
pub const JOB_FAILED: &str = "job.failed";
/// One fan-out slot failed; the batch continues.
pub const FANOUT_SLOT_FAILED: &str = "fanout.slot_failed";
/// Every fan-out slot has settled.
pub const FANOUT_COMPLETED: &str = "fanout.completed";
/// A stage output was written.
pub const STAGE_WRITTEN: &str = "pipeline.stage_written";
/// Later stage outputs were cleared.
pub const STAGES_INVALIDATED: &str = "pipeline.invalidated";
