//! The design pipeline state machine.

use super::snapshot::PipelineSnapshot;
use crate::compose::StageInputs;
use crate::core::{DesignBrief, Stage, StageOutput};
use crate::errors::AtelierError;
use crate::events::{EventSink, STAGES_INVALIDATED, STAGE_WRITTEN};
use crate::studio::DesignStudio;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One populated stage: its current output and the output it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    /// The output later stages derive from.
    pub current: StageOutput,
    /// The previous output, present only after a refinement.
    pub prior: Option<StageOutput>,
}

impl StageRecord {
    fn new(current: StageOutput) -> Self {
        Self {
            current,
            prior: None,
        }
    }
}

/// A design session: stage outputs, edit history and the brief.
///
/// Populated stages always form a prefix of `Stage::ALL`, so invalidating
/// everything after a stage is a single truncation. Operations take
/// `&mut self`, which keeps one operation in flight per pipeline.
pub struct DesignPipeline {
    id: Uuid,
    brief: DesignBrief,
    records: Vec<StageRecord>,
    edit_history: Vec<String>,
    studio: Arc<DesignStudio>,
    events: Arc<dyn EventSink>,
}

impl DesignPipeline {
    /// Starts a session in the `prompt` state.
    #[must_use]
    pub fn new(brief: DesignBrief, studio: Arc<DesignStudio>) -> Self {
        let events = studio.runner().event_sink();
        Self {
            id: Uuid::new_v4(),
            brief,
            records: Vec::with_capacity(Stage::ALL.len()),
            edit_history: Vec::new(),
            studio,
            events,
        }
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The brief.
    #[must_use]
    pub fn brief(&self) -> &DesignBrief {
        &self.brief
    }

    /// The rightmost populated stage, or `None` in the `prompt` state.
    #[must_use]
    pub fn current_stage(&self) -> Option<Stage> {
        self.records.len().checked_sub(1).map(|i| Stage::ALL[i])
    }

    /// The stage's current output.
    #[must_use]
    pub fn output(&self, stage: Stage) -> Option<&StageOutput> {
        self.records.get(stage.index()).map(|r| &r.current)
    }

    /// The output the stage's last refinement replaced.
    #[must_use]
    pub fn prior_output(&self, stage: Stage) -> Option<&StageOutput> {
        self.records.get(stage.index()).and_then(|r| r.prior.as_ref())
    }

    /// Edit instructions applied to the base concept, oldest first.
    #[must_use]
    pub fn edit_history(&self) -> &[String] {
        &self.edit_history
    }

    /// Produces `stage` for the first time.
    ///
    /// # Errors
    ///
    /// `Precondition` if the stage already has an output or the stage
    /// before it has none; otherwise whatever the generation returns.
    pub async fn advance(&mut self, stage: Stage) -> Result<StageOutput, AtelierError> {
        if self.output(stage).is_some() {
            return Err(AtelierError::precondition(format!(
                "{stage} already has an output; refine it instead"
            )));
        }
        if let Some(previous) = stage.previous() {
            if self.output(previous).is_none() {
                return Err(AtelierError::precondition(format!(
                    "{previous} must be generated before {stage}"
                )));
            }
        }

        let inputs = self.source_inputs(stage);
        let output = self.studio.produce(stage, &self.brief, &inputs).await?;

        self.records.push(StageRecord::new(output.clone()));
        self.record_history(stage, self.advance_entry(stage));
        self.written(stage, "advance", &output);
        Ok(output)
    }

    /// Re-produces `stage` from its own current output plus `instruction`,
    /// then clears every later stage.
    ///
    /// # Errors
    ///
    /// `Precondition` if the stage has no output yet or the instruction is
    /// blank; otherwise whatever the generation returns. On error the
    /// pipeline is unchanged.
    pub async fn refine(
        &mut self,
        stage: Stage,
        instruction: &str,
    ) -> Result<StageOutput, AtelierError> {
        let instruction = instruction.trim();
        let Some(record) = self.records.get(stage.index()) else {
            return Err(AtelierError::precondition(format!(
                "{stage} has no output to refine"
            )));
        };
        if instruction.is_empty() {
            return Err(AtelierError::precondition("A refinement instruction is required"));
        }

        let inputs = self
            .source_inputs(stage)
            .with_current(record.current.clone())
            .with_instruction(instruction);
        let output = self.studio.produce(stage, &self.brief, &inputs).await?;

        let record = &mut self.records[stage.index()];
        record.prior = Some(std::mem::replace(&mut record.current, output.clone()));
        self.invalidate_after(stage);
        self.record_history(stage, instruction.to_string());
        self.written(stage, "refine", &output);
        Ok(output)
    }

    /// Applies an instruction to the base design.
    ///
    /// With a sketch present this is a sketch refinement: the current sketch
    /// is the reference and the instruction is the delta. Without one, this
    /// is a first-time generation from the brief. An unset base prompt is
    /// filled from the instruction first; a set one is used verbatim.
    ///
    /// # Errors
    ///
    /// `Precondition` if the instruction is blank; otherwise whatever the
    /// generation returns.
    pub async fn edit_base(&mut self, instruction: &str) -> Result<StageOutput, AtelierError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(AtelierError::precondition("An edit instruction is required"));
        }
        if self.output(Stage::Sketch).is_some() {
            return self.refine(Stage::Sketch, instruction).await;
        }
        if self.brief.has_base_prompt() {
            return self.advance(Stage::Sketch).await;
        }

        self.brief.base_prompt = instruction.to_string();
        let result = self.advance(Stage::Sketch).await;
        if result.is_err() {
            self.brief.base_prompt.clear();
        }
        result
    }

    /// Restores the output the stage's last refinement replaced, then clears
    /// every later stage. No generation call is made.
    ///
    /// # Errors
    ///
    /// `Precondition` if the stage has no prior output.
    pub fn revert(&mut self, stage: Stage) -> Result<StageOutput, AtelierError> {
        let record = self
            .records
            .get_mut(stage.index())
            .filter(|r| r.prior.is_some())
            .ok_or_else(|| AtelierError::precondition(format!("{stage} has no prior output")))?;

        if let Some(prior) = record.prior.take() {
            record.current = prior;
        }
        let output = record.current.clone();
        self.invalidate_after(stage);
        self.written(stage, "revert", &output);
        Ok(output)
    }

    /// A serializable view of the session.
    #[must_use]
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot::capture(
            self.id,
            &self.brief,
            Stage::ALL.map(|stage| (stage, self.output(stage).cloned(), self.prior_output(stage).cloned())),
            &self.edit_history,
            self.current_stage(),
        )
    }

    fn source_inputs(&self, stage: Stage) -> StageInputs {
        let mut inputs = StageInputs::new();
        if let Some(url) = stage
            .source()
            .and_then(|source| self.output(source))
            .and_then(StageOutput::primary_url)
        {
            inputs = inputs.with_source(url);
        }
        if stage == Stage::Angles {
            if let Some(url) = self.output(Stage::Colored).and_then(StageOutput::primary_url) {
                inputs = inputs.with_logo_reference(url);
            }
        }
        if stage == Stage::Sketch {
            inputs = inputs.with_history(self.edit_history.clone());
        }
        inputs
    }

    fn advance_entry(&self, stage: Stage) -> String {
        match stage {
            Stage::Colored => self
                .brief
                .color_summary()
                .map_or_else(|| "Apply colors".to_string(), |c| format!("Apply colors: {c}")),
            _ if self.brief.has_base_prompt() => self.brief.base_prompt.trim().to_string(),
            _ => "Start from uploaded image".to_string(),
        }
    }

    fn record_history(&mut self, stage: Stage, entry: String) {
        if stage.records_history() {
            self.edit_history.push(entry);
        }
    }

    fn invalidate_after(&mut self, stage: Stage) {
        let keep = stage.index() + 1;
        if self.records.len() <= keep {
            return;
        }
        let cleared: Vec<&str> = Stage::ALL[keep..self.records.len()]
            .iter()
            .map(|s| s.as_str())
            .collect();
        warn!(pipeline = %self.id, stage = %stage, cleared = ?cleared, "Later stages invalidated");
        self.events.emit(
            STAGES_INVALIDATED,
            json!({"pipeline": self.id, "after": stage, "stages": cleared}),
        );
        self.records.truncate(keep);
    }

    fn written(&self, stage: Stage, operation: &str, output: &StageOutput) {
        info!(pipeline = %self.id, stage = %stage, operation, "Stage output written");
        self.events.emit(
            STAGE_WRITTEN,
            json!({
                "pipeline": self.id,
                "stage": stage,
                "operation": operation,
                "url": output.primary_url(),
            }),
        );
    }
}

impl std::fmt::Debug for DesignPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignPipeline")
            .field("id", &self.id)
            .field("current_stage", &self.current_stage())
            .field("edit_history", &self.edit_history.len())
            .finish_non_exhaustive()
    }
}
