//! Caller-facing response shape.

use crate::core::{AngleView, JobKind, Stage, StageOutput};
use crate::errors::AtelierError;
use serde::{Deserialize, Serialize};

/// Outcome of one stage operation as returned to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResponse {
    /// Whether the stage produced an output.
    pub success: bool,
    /// Stage name on the wire (`ramp-walk` for the runway).
    pub step: String,
    /// Image URL; for angles, the first successful view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Video URL for the runway stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// User-facing error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every successful view, angles stage only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_views: Option<Vec<AngleView>>,
    /// How many views succeeded, angles stage only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<usize>,
}

impl StageResponse {
    /// A failed response.
    #[must_use]
    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            success: false,
            step: stage.step_name().to_string(),
            image_url: None,
            video_url: None,
            error: Some(message.into()),
            all_views: None,
            view_count: None,
        }
    }

    /// A successful response for `output`.
    #[must_use]
    pub fn success(stage: Stage, output: &StageOutput) -> Self {
        let mut response = Self {
            success: true,
            step: stage.step_name().to_string(),
            image_url: None,
            video_url: None,
            error: None,
            all_views: None,
            view_count: None,
        };

        match output {
            StageOutput::Single(artifact) => match artifact.kind {
                JobKind::Image => response.image_url = Some(artifact.url.clone()),
                JobKind::Video => response.video_url = Some(artifact.url.clone()),
            },
            StageOutput::Views(set) => {
                response.image_url = output.primary_url().map(str::to_string);
                response.view_count = Some(set.view_count());
                response.all_views = Some(set.views.clone());
            }
        }
        response
    }

    /// Renders a stage result.
    #[must_use]
    pub fn from_result(stage: Stage, result: &Result<StageOutput, AtelierError>) -> Self {
        match result {
            Ok(output) => Self::success(stage, output),
            Err(err) => Self::failure(stage, err.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AngleSet, Artifact};
    use serde_json::json;

    #[test]
    fn test_runway_response() {
        let output = StageOutput::Single(Artifact::new("https://cdn.example/walk.mp4", JobKind::Video));
        let response = StageResponse::from_result(Stage::Runway, &Ok(output));

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": true,
                "step": "ramp-walk",
                "videoUrl": "https://cdn.example/walk.mp4"
            })
        );
    }

    #[test]
    fn test_angles_response() {
        let set = AngleSet {
            views: vec![
                AngleView::new("front", "https://cdn.example/front.jpg"),
                AngleView::new("back", "https://cdn.example/back.jpg"),
            ],
            requested: 6,
        };
        let response = StageResponse::success(Stage::Angles, &StageOutput::Views(set));

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["imageUrl"], "https://cdn.example/front.jpg");
        assert_eq!(value["viewCount"], 2);
        assert_eq!(value["allViews"][1]["imageUrl"], "https://cdn.example/back.jpg");
        assert_eq!(value["allViews"][1]["angle"], "back");
    }

    #[test]
    fn test_error_response() {
        let err = AtelierError::TimedOut {
            kind: JobKind::Image,
            checks: 60,
        };
        let response = StageResponse::from_result(Stage::Model, &Err(err));

        assert!(!response.success);
        assert_eq!(response.step, "model");
        assert!(response.error.unwrap().starts_with("Generation took too long"));
    }
}
