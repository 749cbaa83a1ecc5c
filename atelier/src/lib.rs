//! # Atelier
//!
//! Job orchestration and a stage pipeline for progressive garment design
//! generation against a remote, asynchronous inference provider.
//!
//! Atelier provides:
//!
//! - **Job orchestration**: submit, poll on a fixed interval with per-kind
//!   check ceilings, and resubmit whole jobs on transient provider overload
//! - **Fan-out**: run independent jobs concurrently and keep partial results
//! - **A pipeline state machine**: sketch, colored, model, angles and runway
//!   stages with advance, refine, edit-base and revert, downstream
//!   invalidation and an append-only edit history
//! - **Observability**: `tracing` spans and lifecycle events through an
//!   `EventSink`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use atelier::prelude::*;
//! use std::sync::Arc;
//!
//! let config = AtelierConfig::from_env();
//! let studio = Arc::new(DesignStudio::from_config(&config)?);
//!
//! let mut pipeline = DesignPipeline::new(DesignBrief::new("cropped wool bomber"), studio);
//! pipeline.advance(Stage::Sketch).await?;
//! pipeline.advance(Stage::Colored).await?;
//! pipeline.refine(Stage::Sketch, "shorter sleeves").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod client;
pub mod compose;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod jobs;
pub mod observability;
pub mod pipeline;
pub mod studio;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::{GenerationRequest, InferenceClient, JobHandle, Rejection, StatusReport};
    #[cfg(feature = "http")]
    pub use crate::client::HttpInferenceClient;
    pub use crate::compose::{BriefComposer, PromptComposer, StageInputs};
    pub use crate::config::{AtelierConfig, PollConfig, ProviderConfig, RetryConfig};
    pub use crate::core::{
        AngleSet, AngleView, Artifact, DesignBrief, JobKind, ReferenceAsset, Stage, StageOutput,
    };
    pub use crate::errors::{AtelierError, ErrorCategory};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::jobs::{
        FanOutCoordinator, FanOutReport, PhraseClassifier, Poller, RetryingJobRunner,
        TransientClassifier,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{DesignPipeline, PipelineSnapshot};
    pub use crate::studio::{DesignStudio, StageResponse};
}
