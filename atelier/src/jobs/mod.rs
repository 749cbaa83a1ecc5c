//! Job orchestration: polling, whole-job retry and fan-out.
//!
//! A `GenerationRequest` becomes an `Artifact` through three layers:
//!
//! - `Poller` checks one accepted job on a fixed interval until it settles
//!   or runs out of checks.
//! - `RetryingJobRunner` submits, polls, and resubmits the whole job on
//!   transient provider failure with a fixed backoff schedule.
//! - `FanOutCoordinator` runs independent jobs concurrently and keeps any
//!   partial result.

mod classify;
mod clock;
mod fanout;
mod poller;
mod runner;

pub use classify::{PhraseClassifier, RegexClassifier, TransientClassifier, DEFAULT_TRANSIENT_PHRASES};
pub use clock::{Sleeper, TokioSleeper};
pub use fanout::{FanOutCoordinator, FanOutReport, FanOutSlot};
pub use poller::{PollOutcome, PollState, Poller};
pub use runner::{GenerationJob, RetryingJobRunner};
