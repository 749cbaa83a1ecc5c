//! Request composition: turning a brief and stage inputs into provider
//! payloads.
//!
//! Prompt wording is a collaborator concern. The pipeline only depends on the
//! `PromptComposer` trait; `BriefComposer` is a plain default that follows the
//! provider's reference-image conventions.

mod brief;

pub use brief::{BriefComposer, CameraAngle, CAMERA_ANGLES};

use crate::client::GenerationRequest;
use crate::core::{DesignBrief, Stage, StageOutput};
use crate::errors::AtelierError;

/// Everything a stage needs beyond the brief.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInputs {
    /// URL of the artifact this stage derives from.
    pub source_url: Option<String>,
    /// The stage's own current output, present when refining.
    pub current: Option<StageOutput>,
    /// Refinement instruction (the delta only).
    pub instruction: Option<String>,
    /// Secondary reference used to keep logos consistent (the colored image).
    pub logo_reference: Option<String>,
    /// Edit history, oldest first, passed as context to sketch edits.
    pub history: Vec<String>,
}

impl StageInputs {
    /// Creates empty inputs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source artifact URL.
    #[must_use]
    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Sets the stage's current output.
    #[must_use]
    pub fn with_current(mut self, current: StageOutput) -> Self {
        self.current = Some(current);
        self
    }

    /// Sets the refinement instruction.
    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Sets the logo reference.
    #[must_use]
    pub fn with_logo_reference(mut self, url: impl Into<String>) -> Self {
        self.logo_reference = Some(url.into());
        self
    }

    /// Sets the edit history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.history = history;
        self
    }

    /// Whether these inputs describe a refinement of an existing output.
    #[must_use]
    pub fn is_refinement(&self) -> bool {
        self.current.is_some()
    }

    /// The instruction, if present and not blank.
    #[must_use]
    pub fn instruction(&self) -> Option<&str> {
        self.instruction
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One provider request, labelled for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedJob {
    /// Stage name, or the camera angle for view jobs.
    pub label: String,
    /// The request.
    pub request: GenerationRequest,
}

impl ComposedJob {
    /// Creates a labelled job.
    #[must_use]
    pub fn new(label: impl Into<String>, request: GenerationRequest) -> Self {
        Self {
            label: label.into(),
            request,
        }
    }
}

/// Builds the provider requests for one stage.
pub trait PromptComposer: Send + Sync {
    /// Composes the requests for `stage`.
    ///
    /// Single-artifact stages return exactly one job; the angles stage
    /// returns one job per camera angle.
    ///
    /// # Errors
    ///
    /// Returns `AtelierError::Precondition` when a required input is missing.
    fn compose(
        &self,
        stage: Stage,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> Result<Vec<ComposedJob>, AtelierError>;
}
