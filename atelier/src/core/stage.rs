//! Pipeline stage ordering.

use super::JobKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One named step of the design pipeline, in strict pipeline order.
///
/// The pipeline starts in the `prompt` state, which has no artifact and
/// therefore no variant here; see `DesignPipeline::current_stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Line drawing of the garment.
    Sketch,
    /// Colored rendering of the sketch.
    Colored,
    /// Photo of a model wearing the garment.
    Model,
    /// Six fixed camera angles of the model photo.
    Angles,
    /// Runway walk video.
    Runway,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Sketch,
        Self::Colored,
        Self::Model,
        Self::Angles,
        Self::Runway,
    ];

    /// Zero-based position in the pipeline.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Sketch => 0,
            Self::Colored => 1,
            Self::Model => 2,
            Self::Angles => 3,
            Self::Runway => 4,
        }
    }

    /// The stage whose artifact this stage consumes, if any.
    ///
    /// Angles and runway both derive from the model photo.
    #[must_use]
    pub const fn source(self) -> Option<Self> {
        match self {
            Self::Sketch => None,
            Self::Colored => Some(Self::Sketch),
            Self::Model => Some(Self::Colored),
            Self::Angles | Self::Runway => Some(Self::Model),
        }
    }

    /// The stage immediately before this one in pipeline order.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Stages strictly after this one.
    #[must_use]
    pub fn later(self) -> &'static [Self] {
        &Self::ALL[self.index() + 1..]
    }

    /// The job kind used to produce this stage's artifact.
    #[must_use]
    pub const fn kind(self) -> JobKind {
        match self {
            Self::Runway => JobKind::Video,
            _ => JobKind::Image,
        }
    }

    /// Whether refinements of this stage are recorded in the edit history.
    #[must_use]
    pub const fn records_history(self) -> bool {
        matches!(self, Self::Sketch | Self::Colored)
    }

    /// Name used in caller-facing responses.
    #[must_use]
    pub const fn step_name(self) -> &'static str {
        match self {
            Self::Sketch => "sketch",
            Self::Colored => "colored",
            Self::Model => "model",
            Self::Angles => "angles",
            Self::Runway => "ramp-walk",
        }
    }

    /// Stable identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sketch => "sketch",
            Self::Colored => "colored",
            Self::Model => "model",
            Self::Angles => "angles",
            Self::Runway => "runway",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
