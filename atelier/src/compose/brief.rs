//! Default composer built from the design brief.

use super::{ComposedJob, PromptComposer, StageInputs};
use crate::client::GenerationRequest;
use crate::core::{DesignBrief, Stage, StageOutput};
use crate::errors::AtelierError;
use serde_json::{json, Map, Value};

/// Preservation weight for sketch edits.
const SKETCH_EDIT_STRENGTH: f64 = 0.98;
/// Preservation weight for color refinements.
const COLOR_REFINE_STRENGTH: f64 = 0.90;
/// Preservation weight for the model photo.
const MODEL_STRENGTH: f64 = 0.92;
/// Preservation weight for angle views.
const ANGLE_STRENGTH: f64 = 0.90;

const SKETCH_NEGATIVE: &str = "photograph, photo, 3D render, photorealistic, product mockup, \
    model wearing clothes, amateur sketch, crude lines, text labels";
const SKETCH_EDIT_NEGATIVE: &str = "completely new design, different garment, redesigned, \
    reimagined, changed silhouette, modified structure, oversized logo, logo enlargement";
const COLOR_NEGATIVE: &str = "rainbow colors, multicolor, varied colors, garish colors, neon, \
    flat colors, washed out, muddy colors";
const MODEL_NEGATIVE: &str = "different outfit, changed design, altered colors, modified \
    patterns, low quality, blurry, cropped body, cropped head, headless, half body";
const ANGLE_NEGATIVE: &str = "different outfit, changed design, altered colors, missing logo, \
    oversized logo, moved logo, low quality, blurry, cropped body, missing feet, missing head";
const RUNWAY_NEGATIVE: &str = "different outfit, changed clothes, altered colors, multiple \
    models, cut, transition, static, blurry, low quality, cropped head, cropped feet";

/// A fixed camera angle for the angles stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraAngle {
    /// Angle identifier reported back to the caller.
    pub name: &'static str,
    /// Shot description.
    pub shot: &'static str,
}

/// The six angles, in request order.
pub const CAMERA_ANGLES: [CameraAngle; 6] = [
    CameraAngle {
        name: "front",
        shot: "Direct front view, facing camera, full body shot",
    },
    CameraAngle {
        name: "back",
        shot: "Back view, showing back details, full body shot",
    },
    CameraAngle {
        name: "left_side",
        shot: "Left side profile view, full body shot",
    },
    CameraAngle {
        name: "right_side",
        shot: "Right side profile view, full body shot",
    },
    CameraAngle {
        name: "three_quarter_front",
        shot: "Three-quarter front view, 45 degree angle, full body shot",
    },
    CameraAngle {
        name: "three_quarter_back",
        shot: "Three-quarter back view, 45 degree angle, full body shot",
    },
];

/// Video flags for the runway clip.
const RUNWAY_DURATION_SECS: u32 = 8;
const RUNWAY_ASPECT_RATIO: &str = "16:9";
const RUNWAY_RESOLUTION: &str = "1080p";

/// Composes requests from the brief with short, direct prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct BriefComposer;

impl BriefComposer {
    /// Creates the composer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn sketch(brief: &DesignBrief, inputs: &StageInputs) -> Result<ComposedJob, AtelierError> {
        if let Some(current) = inputs.current.as_ref() {
            let reference = require_url(current.primary_url(), "Current sketch is required")?;
            let change = inputs
                .instruction()
                .ok_or_else(|| AtelierError::precondition("An edit instruction is required"))?;
            let prompt = edit_prompt(change, &inputs.history);
            let input = image_payload(
                prompt,
                vec![reference.to_string()],
                Some(SKETCH_EDIT_STRENGTH),
                SKETCH_EDIT_NEGATIVE,
            );
            return Ok(ComposedJob::new(Stage::Sketch.as_str(), GenerationRequest::image(input)));
        }

        if let Some(upload) = brief.uploaded_image.as_ref() {
            let direction = if brief.has_base_prompt() {
                brief.base_prompt.trim()
            } else {
                "keep the garment as shown"
            };
            let prompt = format!(
                "Redraw the garment in the reference image as a professional fashion design \
                 sketch, pencil line art on white paper. Direction: {direction}"
            );
            let input = image_payload(
                prompt,
                vec![upload.as_str().to_string()],
                Some(SKETCH_EDIT_STRENGTH),
                SKETCH_NEGATIVE,
            );
            return Ok(ComposedJob::new(Stage::Sketch.as_str(), GenerationRequest::image(input)));
        }

        if !brief.has_base_prompt() {
            return Err(AtelierError::precondition("A design description is required"));
        }

        let mut prompt = String::new();
        if brief.uploaded_logo.is_some() {
            prompt.push_str(
                "Place the logo from the reference image on the garment, small and refined, \
                 copied exactly. ",
            );
        }
        prompt.push_str(&format!(
            "Professional fashion design sketch of a {}. Design direction: {}. \
             Hand-drawn pencil line art on white paper showing all construction details.",
            garment_line(brief),
            brief.base_prompt.trim()
        ));

        // Logo goes first so it is the primary reference.
        let references = brief
            .uploaded_logo
            .iter()
            .map(|logo| logo.as_str().to_string())
            .collect();
        let input = image_payload(prompt, references, None, SKETCH_NEGATIVE);
        Ok(ComposedJob::new(Stage::Sketch.as_str(), GenerationRequest::image(input)))
    }

    fn colored(brief: &DesignBrief, inputs: &StageInputs) -> Result<ComposedJob, AtelierError> {
        let sketch = require_url(inputs.source_url.as_deref(), "Sketch URL is required")?;
        let palette = brief
            .color_summary()
            .map_or_else(|| "appropriate colors".to_string(), |c| format!("ONLY {c}"));

        let input = match inputs.current.as_ref() {
            Some(current) => {
                let reference = require_url(current.primary_url(), "Current colored image is required")?;
                let change = inputs.instruction().unwrap_or("refine the colors");
                let prompt = format!(
                    "Color refinement. Copy the reference garment exactly and make only this \
                     change: \"{change}\". Use {palette}. Keep silhouette, details and logos identical."
                );
                image_payload(
                    prompt,
                    vec![reference.to_string()],
                    Some(COLOR_REFINE_STRENGTH),
                    COLOR_NEGATIVE,
                )
            }
            None => {
                let mut prompt = format!(
                    "Colorize this fashion design sketch for a luxury lookbook. Use {palette}. \
                     Preserve every construction line."
                );
                if let Some(direction) = inputs.instruction() {
                    prompt.push_str(&format!(" Additional direction: {direction}"));
                }
                image_payload(prompt, vec![sketch.to_string()], None, COLOR_NEGATIVE)
            }
        };
        Ok(ComposedJob::new(Stage::Colored.as_str(), GenerationRequest::image(input)))
    }

    fn model(brief: &DesignBrief, inputs: &StageInputs) -> Result<ComposedJob, AtelierError> {
        let design = require_url(inputs.source_url.as_deref(), "Colored design URL is required")?;
        let reference = match inputs.current.as_ref() {
            Some(current) => require_url(current.primary_url(), "Current model photo is required")?,
            None => design,
        };

        let mut prompt = format!(
            "High-fashion editorial photograph of {} wearing the exact garment from the \
             reference image. Full body, head to toe, face visible, clean studio background.",
            model_description(brief)
        );
        if let Some(change) = inputs.instruction() {
            prompt.push_str(&format!(" Change only this: {change}"));
        }

        let negative = match gender(brief) {
            Gender::Male => format!("woman, female, feminine, {MODEL_NEGATIVE}"),
            Gender::Female => format!("man, male, masculine, {MODEL_NEGATIVE}"),
            Gender::Unspecified => MODEL_NEGATIVE.to_string(),
        };
        let input = image_payload(prompt, vec![reference.to_string()], Some(MODEL_STRENGTH), &negative);
        Ok(ComposedJob::new(Stage::Model.as_str(), GenerationRequest::image(input)))
    }

    fn angles(brief: &DesignBrief, inputs: &StageInputs) -> Result<Vec<ComposedJob>, AtelierError> {
        let photo = require_url(inputs.source_url.as_deref(), "Model photo URL is required")?;
        let current = inputs.current.as_ref().and_then(StageOutput::as_views);

        Ok(CAMERA_ANGLES
            .iter()
            .map(|angle| {
                let base = current
                    .and_then(|views| views.view(angle.name))
                    .map_or(photo, |view| view.image_url.as_str());
                let mut references = vec![base.to_string()];
                if let Some(logo) = inputs.logo_reference.as_ref() {
                    references.push(logo.clone());
                }

                let mut prompt = format!(
                    "360 degree fashion campaign shoot of the same model wearing the exact same \
                     {} from the reference images. Only the camera angle changes. Angle: {}. \
                     Logos at the same size and position.",
                    brief.garment_type.as_deref().unwrap_or("outfit"),
                    angle.shot
                );
                if let Some(change) = inputs.instruction() {
                    prompt.push_str(&format!(" Change only this: {change}"));
                }

                let input = image_payload(prompt, references, Some(ANGLE_STRENGTH), ANGLE_NEGATIVE);
                ComposedJob::new(angle.name, GenerationRequest::image(input))
            })
            .collect())
    }

    fn runway(brief: &DesignBrief, inputs: &StageInputs) -> Result<ComposedJob, AtelierError> {
        let photo = require_url(inputs.source_url.as_deref(), "Model photo URL is required")?;

        let mut prompt = format!(
            "Dolly shot of {} wearing the exact same outfit from the reference image, walking \
             confidently down a luxury fashion week runway toward the camera. Full body visible \
             at all times, spotlights from above, solo model, cinematic quality.",
            model_description(brief)
        );
        if let Some(change) = inputs.instruction() {
            prompt.push_str(&format!(" {change}"));
        }

        let input = json!({
            "prompt": prompt,
            "image": photo,
            "duration": RUNWAY_DURATION_SECS,
            "aspect_ratio": RUNWAY_ASPECT_RATIO,
            "resolution": RUNWAY_RESOLUTION,
            "generate_audio": true,
            "negative_prompt": RUNWAY_NEGATIVE,
        });
        Ok(ComposedJob::new(Stage::Runway.as_str(), GenerationRequest::video(input)))
    }
}

impl PromptComposer for BriefComposer {
    fn compose(
        &self,
        stage: Stage,
        brief: &DesignBrief,
        inputs: &StageInputs,
    ) -> Result<Vec<ComposedJob>, AtelierError> {
        match stage {
            Stage::Sketch => Self::sketch(brief, inputs).map(|job| vec![job]),
            Stage::Colored => Self::colored(brief, inputs).map(|job| vec![job]),
            Stage::Model => Self::model(brief, inputs).map(|job| vec![job]),
            Stage::Angles => Self::angles(brief, inputs),
            Stage::Runway => Self::runway(brief, inputs).map(|job| vec![job]),
        }
    }
}

enum Gender {
    Male,
    Female,
    Unspecified,
}

fn gender(brief: &DesignBrief) -> Gender {
    match brief.gender.as_deref().map(str::to_lowercase).as_deref() {
        Some("men" | "male") => Gender::Male,
        Some("women" | "female") => Gender::Female,
        _ => Gender::Unspecified,
    }
}

fn model_description(brief: &DesignBrief) -> &'static str {
    match gender(brief) {
        Gender::Male => "a male fashion model",
        Gender::Female => "a female fashion model",
        Gender::Unspecified => "a fashion model",
    }
}

/// `"jacket designed for women with wool fabric, slim fit"`.
fn garment_line(brief: &DesignBrief) -> String {
    let mut line = brief.garment_type.clone().unwrap_or_else(|| "garment".into());
    if let Some(gender) = brief.gender.as_deref().filter(|g| !g.trim().is_empty()) {
        line.push_str(&format!(" designed for {}", gender.trim().to_lowercase()));
    }
    if let Some(features) = brief.attribute_summary() {
        line.push_str(&format!(" with {features}"));
    }
    line
}

fn edit_prompt(change: &str, history: &[String]) -> String {
    let mut prompt = format!(
        "Micro-edit, not a redesign. Copy the reference image exactly and change only this: \
         \"{change}\". Keep the silhouette, construction lines, logos and proportions identical."
    );
    if !history.is_empty() {
        prompt.push_str("\nAlready applied (context only, do not redo):");
        for (i, entry) in history.iter().enumerate() {
            prompt.push_str(&format!("\n{}. {entry}", i + 1));
        }
    }
    prompt
}

fn require_url<'a>(url: Option<&'a str>, message: &str) -> Result<&'a str, AtelierError> {
    url.filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AtelierError::precondition(message))
}

fn image_payload(
    prompt: String,
    references: Vec<String>,
    strength: Option<f64>,
    negative: &str,
) -> Value {
    let mut input = Map::new();
    input.insert("prompt".into(), Value::String(prompt));
    if !references.is_empty() {
        input.insert(
            "image_input".into(),
            Value::Array(references.into_iter().map(Value::String).collect()),
        );
    }
    input.insert("output_format".into(), json!("jpg"));
    if let Some(strength) = strength {
        input.insert("image_strength".into(), json!(strength));
    }
    input.insert("negative_prompt".into(), json!(negative));
    Value::Object(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AngleSet, AngleView, Artifact, JobKind, ReferenceAsset};
    use pretty_assertions::assert_eq;

    fn compose_one(stage: Stage, brief: &DesignBrief, inputs: &StageInputs) -> GenerationRequest {
        let mut jobs = BriefComposer.compose(stage, brief, inputs).unwrap();
        assert_eq!(jobs.len(), 1);
        jobs.remove(0).request
    }

    fn image(url: &str) -> StageOutput {
        StageOutput::Single(Artifact::new(url, JobKind::Image))
    }

    #[test]
    fn test_new_sketch_puts_logo_first() {
        let brief = DesignBrief::new("cropped bomber")
            .with_garment_type("jacket")
            .with_gender("Women")
            .with_attribute("fabric", "wool")
            .with_logo(ReferenceAsset::url("https://cdn.example/logo.png"));

        let request = compose_one(Stage::Sketch, &brief, &StageInputs::new());

        assert_eq!(request.kind, JobKind::Image);
        assert_eq!(request.input["image_input"], json!(["https://cdn.example/logo.png"]));
        assert!(request.input.get("image_strength").is_none());
        let prompt = request.input["prompt"].as_str().unwrap();
        assert!(prompt.contains("jacket designed for women with wool fabric"));
        assert!(prompt.contains("cropped bomber"));
    }

    #[test]
    fn test_new_sketch_without_logo_has_no_references() {
        let request = compose_one(Stage::Sketch, &DesignBrief::new("linen shirt"), &StageInputs::new());
        assert!(request.input.get("image_input").is_none());
        assert_eq!(request.input["output_format"], "jpg");
    }

    #[test]
    fn test_sketch_requires_description() {
        let err = BriefComposer
            .compose(Stage::Sketch, &DesignBrief::default(), &StageInputs::new())
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_uploaded_image_is_the_base() {
        let brief = DesignBrief::default()
            .with_uploaded_image(ReferenceAsset::from_bytes("image/png", b"png"));
        let request = compose_one(Stage::Sketch, &brief, &StageInputs::new());

        let refs = request.input["image_input"].as_array().unwrap();
        assert_eq!(refs.len(), 1);
        assert!(refs[0].as_str().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(request.input["image_strength"], SKETCH_EDIT_STRENGTH);
    }

    #[test]
    fn test_sketch_edit_uses_current_sketch_only() {
        let brief = DesignBrief::new("bomber")
            .with_logo(ReferenceAsset::url("https://cdn.example/logo.png"));
        let inputs = StageInputs::new()
            .with_current(image("https://cdn.example/sketch-1.jpg"))
            .with_instruction("shorter sleeves")
            .with_history(vec!["bomber".into(), "add hood".into()]);

        let request = compose_one(Stage::Sketch, &brief, &inputs);

        assert_eq!(request.input["image_input"], json!(["https://cdn.example/sketch-1.jpg"]));
        assert_eq!(request.input["image_strength"], 0.98);
        let prompt = request.input["prompt"].as_str().unwrap();
        assert!(prompt.contains("\"shorter sleeves\""));
        assert!(prompt.contains("2. add hood"));
    }

    #[test]
    fn test_colored_first_pass_and_refine() {
        let brief = DesignBrief::new("coat").with_colors(["navy", "white"]);
        let first = compose_one(
            Stage::Colored,
            &brief,
            &StageInputs::new().with_source("https://cdn.example/sketch.jpg"),
        );
        assert_eq!(first.input["image_input"], json!(["https://cdn.example/sketch.jpg"]));
        assert!(first.input.get("image_strength").is_none());
        assert!(first.input["prompt"].as_str().unwrap().contains("ONLY navy and white"));

        let refine = compose_one(
            Stage::Colored,
            &brief,
            &StageInputs::new()
                .with_source("https://cdn.example/sketch.jpg")
                .with_current(image("https://cdn.example/colored-1.jpg"))
                .with_instruction("darker navy"),
        );
        assert_eq!(refine.input["image_input"], json!(["https://cdn.example/colored-1.jpg"]));
        assert_eq!(refine.input["image_strength"], 0.90);
    }

    #[test]
    fn test_colored_requires_sketch() {
        let err = BriefComposer
            .compose(Stage::Colored, &DesignBrief::new("coat"), &StageInputs::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Precondition failed: Sketch URL is required");
    }

    #[test]
    fn test_model_payload() {
        let brief = DesignBrief::new("coat").with_gender("Men");
        let request = compose_one(
            Stage::Model,
            &brief,
            &StageInputs::new().with_source("https://cdn.example/colored.jpg"),
        );
        assert_eq!(request.input["image_input"], json!(["https://cdn.example/colored.jpg"]));
        assert_eq!(request.input["image_strength"], 0.92);
        assert!(request.input["prompt"].as_str().unwrap().contains("a male fashion model"));
        assert!(request.input["negative_prompt"].as_str().unwrap().starts_with("woman"));
    }

    #[test]
    fn test_angles_fan_out_with_logo_reference() {
        let inputs = StageInputs::new()
            .with_source("https://cdn.example/model.jpg")
            .with_logo_reference("https://cdn.example/colored.jpg");

        let jobs = BriefComposer
            .compose(Stage::Angles, &DesignBrief::new("coat"), &inputs)
            .unwrap();

        let labels: Vec<&str> = jobs.iter().map(|j| j.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["front", "back", "left_side", "right_side", "three_quarter_front", "three_quarter_back"]
        );
        for job in &jobs {
            assert_eq!(
                job.request.input["image_input"],
                json!(["https://cdn.example/model.jpg", "https://cdn.example/colored.jpg"])
            );
            assert_eq!(job.request.input["image_strength"], 0.90);
        }
    }

    #[test]
    fn test_angles_refine_uses_each_current_view() {
        let views = AngleSet {
            views: vec![AngleView::new("back", "https://cdn.example/back-1.jpg")],
            requested: 6,
        };
        let inputs = StageInputs::new()
            .with_source("https://cdn.example/model.jpg")
            .with_current(StageOutput::Views(views))
            .with_instruction("warmer light");

        let jobs = BriefComposer
            .compose(Stage::Angles, &DesignBrief::new("coat"), &inputs)
            .unwrap();

        assert_eq!(jobs[0].request.input["image_input"], json!(["https://cdn.example/model.jpg"]));
        assert_eq!(jobs[1].request.input["image_input"], json!(["https://cdn.example/back-1.jpg"]));
        assert!(jobs[1].request.input["prompt"].as_str().unwrap().contains("warmer light"));
    }

    #[test]
    fn test_runway_video_flags() {
        let request = compose_one(
            Stage::Runway,
            &DesignBrief::new("coat"),
            &StageInputs::new().with_source("https://cdn.example/model.jpg"),
        );

        assert_eq!(request.kind, JobKind::Video);
        assert_eq!(request.input["image"], "https://cdn.example/model.jpg");
        assert_eq!(request.input["duration"], 8);
        assert_eq!(request.input["aspect_ratio"], "16:9");
        assert_eq!(request.input["resolution"], "1080p");
        assert_eq!(request.input["generate_audio"], true);
    }
}
