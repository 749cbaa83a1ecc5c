//! Serializable pipeline snapshots for external persistence.

use crate::core::{DesignBrief, Stage, StageOutput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Name of the state before any stage has an output.
pub const PROMPT_STATE: &str = "prompt";

/// A point-in-time copy of a pipeline's outputs and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    /// Session identifier.
    pub id: Uuid,
    /// The brief at the time of the snapshot.
    pub brief: DesignBrief,
    /// Every stage, mapped to its current output or `null`.
    pub outputs: BTreeMap<Stage, Option<StageOutput>>,
    /// Outputs replaced by the last refinement of each stage, where present.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prior_outputs: BTreeMap<Stage, StageOutput>,
    /// Edit instructions, oldest first.
    pub edit_history: Vec<String>,
    /// `prompt`, or the rightmost populated stage.
    pub current_stage: String,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

impl PipelineSnapshot {
    pub(crate) fn capture(
        id: Uuid,
        brief: &DesignBrief,
        stages: [(Stage, Option<StageOutput>, Option<StageOutput>); 5],
        edit_history: &[String],
        current_stage: Option<Stage>,
    ) -> Self {
        let mut outputs = BTreeMap::new();
        let mut prior_outputs = BTreeMap::new();
        for (stage, current, prior) in stages {
            outputs.insert(stage, current);
            if let Some(prior) = prior {
                prior_outputs.insert(stage, prior);
            }
        }

        Self {
            id,
            brief: brief.clone(),
            outputs,
            prior_outputs,
            edit_history: edit_history.to_vec(),
            current_stage: current_stage.map_or(PROMPT_STATE, Stage::as_str).to_string(),
            taken_at: Utc::now(),
        }
    }

    /// Number of stages with an output.
    #[must_use]
    pub fn populated(&self) -> usize {
        self.outputs.values().filter(|o| o.is_some()).count()
    }

    /// Serializes the snapshot to JSON.
    ///
    /// # Errors
    ///
    /// Returns `AtelierError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, crate::errors::AtelierError> {
        Ok(serde_json::to_string(self)?)
    }
}
