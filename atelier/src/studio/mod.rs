//! The caller-facing generation API: one operation per stage.
//!
//! `DesignStudio` composes a stage's requests, validates inputs before any
//! network call, and routes them through the retrying runner or the fan-out
//! coordinator. It holds no design state; see `DesignPipeline` for that.

mod response;

pub use response::StageResponse;

use crate::client::InferenceClient;
use crate::compose::{BriefComposer, ComposedJob, PromptComposer, StageInputs};
use crate::config::AtelierConfig;
use crate::core::{AngleSet, AngleView, Artifact, DesignBrief, Stage, StageOutput};
use crate::errors::AtelierError;
use crate::jobs::{FanOutCoordinator, RetryingJobRunner};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// Produces stage artifacts.
#[derive(Clone)]
pub struct DesignStudio {
    runner: Arc<RetryingJobRunner>,
    fanout: FanOutCoordinator,
    composer: Arc<dyn PromptComposer>,
}

impl DesignStudio {
    /// Creates a studio over a runner, composing with `BriefComposer`.
    #[must_use]
    pub fn new(runner: Arc<RetryingJobRunner>) -> Self {
        Self {
            fanout: FanOutCoordinator::new(runner.clone()),
            runner,
            composer: Arc::new(BriefComposer::new()),
        }
    }

    /// Creates a studio over `client` with the given configuration.
    #[must_use]
    pub fn from_client(client: Arc<dyn InferenceClient>, config: &AtelierConfig) -> Self {
        Self::new(Arc::new(RetryingJobRunner::from_config(client, config)))
    }

    /// Creates a studio talking to the HTTP provider.
    ///
    /// # Errors
    ///
    /// Returns `AtelierError::Config` if no API token is configured.
    #[cfg(feature = "http")]
    pub fn from_config(config: &AtelierConfig) -> Result<Self, AtelierError> {
        let client = crate::client::HttpInferenceClient::new(config.provider.clone())?;
        Ok(Self::from_client(Arc::new(client), config))
    }

    /// Replaces the prompt composer.
    #[must_use]
    pub fn with_composer(mut self, composer: Arc<dyn PromptComposer>) -> Self {
        self.composer = composer;
        self
    }

    /// The underlying job runner.
    #[must_use]
    pub fn runner(&self) -> &Arc<RetryingJobRunner> {
        &self.runner
    }

    /// Produces `stage`'s output.
    ///
    /// Composition runs first, so a missing input is rejected before any
    /// network call.
    pub async fn produce(
        &self,
        stage: Stage,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> Result<StageOutput, AtelierError> {
        let jobs = self.composer.compose(stage, brief, inputs)?;
        let span = info_span!("stage", stage = %stage, jobs = jobs.len());
        self.run_jobs(stage, jobs).instrument(span).await
    }

    async fn run_jobs(
        &self,
        stage: Stage,
        mut jobs: Vec<ComposedJob>,
    ) -> Result<StageOutput, AtelierError> {
        if stage == Stage::Angles {
            let labels: Vec<String> = jobs.iter().map(|job| job.label.clone()).collect();
            let requests = jobs.into_iter().map(|job| job.request).collect();
            let report = self.fanout.run_all(requests).await?;

            let views: Vec<AngleView> = report
                .successes()
                .filter_map(|(index, artifact)| {
                    labels
                        .get(index)
                        .map(|angle| AngleView::new(angle.clone(), artifact.url.clone()))
                })
                .collect();
            info!(views = views.len(), requested = labels.len(), "Angle views generated");
            return Ok(StageOutput::Views(AngleSet {
                views,
                requested: labels.len(),
            }));
        }

        if jobs.len() != 1 {
            return Err(AtelierError::Config(format!(
                "composer returned {} requests for the {stage} stage",
                jobs.len()
            )));
        }
        let job = jobs.remove(0);
        let artifact = self.runner.run(job.request).await?;
        info!(url = %artifact.url, "Stage artifact generated");
        Ok(StageOutput::Single(artifact))
    }

    async fn produce_single(
        &self,
        stage: Stage,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> Result<Artifact, AtelierError> {
        match self.produce(stage, brief, inputs).await? {
            StageOutput::Single(artifact) => Ok(artifact),
            StageOutput::Views(_) => Err(AtelierError::Config(format!(
                "the {stage} stage produced views instead of one artifact"
            ))),
        }
    }

    /// Generates or edits a sketch.
    pub async fn generate_sketch(
        &self,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> Result<Artifact, AtelierError> {
        self.produce_single(Stage::Sketch, brief, inputs).await
    }

    /// Colors a sketch, or refines a colored image.
    pub async fn add_colors(
        &self,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> Result<Artifact, AtelierError> {
        self.produce_single(Stage::Colored, brief, inputs).await
    }

    /// Renders the colored design on a model.
    pub async fn generate_model(
        &self,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> Result<Artifact, AtelierError> {
        self.produce_single(Stage::Model, brief, inputs).await
    }

    /// Generates the six camera angles of the model photo.
    pub async fn generate_angles(
        &self,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> Result<AngleSet, AtelierError> {
        match self.produce(Stage::Angles, brief, inputs).await? {
            StageOutput::Views(set) => Ok(set),
            StageOutput::Single(_) => Err(AtelierError::Config(
                "the angles stage produced a single artifact".into(),
            )),
        }
    }

    /// Generates the runway video.
    pub async fn generate_runway(
        &self,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> Result<Artifact, AtelierError> {
        self.produce_single(Stage::Runway, brief, inputs).await
    }

    /// Produces `stage` and renders the outcome as a caller-facing response.
    pub async fn respond(
        &self,
        stage: Stage,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> StageResponse {
        let result = self.produce(stage, brief, inputs).await;
        StageResponse::from_result(stage, &result)
    }
}

impl std::fmt::Debug for DesignStudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignStudio")
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}
