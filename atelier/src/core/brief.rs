//! The design brief: descriptive inputs supplied by the caller.

use super::ReferenceAsset;
use serde::{Deserialize, Serialize};

/// Attribute values that mean "nothing to describe".
const EMPTY_ATTRIBUTE_VALUES: [&str; 3] = ["none", "plain", "no pockets"];

/// One descriptive garment attribute, e.g. `fabric = "wool"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarmentAttribute {
    /// Attribute name (`fabric`, `sleeves`, `neckline`, ...).
    pub name: String,
    /// Chosen value.
    pub value: String,
}

/// Descriptive inputs for a design session.
///
/// The brief is set when the session starts; the pipeline only ever reads it,
/// except that an empty `base_prompt` may be filled once by the first edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignBrief {
    /// Long-form creative description of the garment.
    pub base_prompt: String,
    /// Garment type, e.g. `jacket`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garment_type: Option<String>,
    /// Target wearer, e.g. `Women`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Palette for the colored stage.
    #[serde(default)]
    pub selected_colors: Vec<String>,
    /// Ordered descriptive attributes.
    #[serde(default)]
    pub garment_attributes: Vec<GarmentAttribute>,
    /// Logo to place on a new design.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_logo: Option<ReferenceAsset>,
    /// Image to start the sketch from instead of generating one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_image: Option<ReferenceAsset>,
}

impl DesignBrief {
    /// Creates a brief from its base prompt.
    #[must_use]
    pub fn new(base_prompt: impl Into<String>) -> Self {
        Self {
            base_prompt: base_prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the garment type.
    #[must_use]
    pub fn with_garment_type(mut self, garment_type: impl Into<String>) -> Self {
        self.garment_type = Some(garment_type.into());
        self
    }

    /// Sets the target wearer.
    #[must_use]
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    /// Sets the color palette.
    #[must_use]
    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_colors = colors.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a garment attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.garment_attributes.push(GarmentAttribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Sets the logo asset.
    #[must_use]
    pub fn with_logo(mut self, logo: ReferenceAsset) -> Self {
        self.uploaded_logo = Some(logo);
        self
    }

    /// Sets an uploaded base image for the sketch stage.
    #[must_use]
    pub fn with_uploaded_image(mut self, image: ReferenceAsset) -> Self {
        self.uploaded_image = Some(image);
        self
    }

    /// Whether the base prompt has been set.
    #[must_use]
    pub fn has_base_prompt(&self) -> bool {
        !self.base_prompt.trim().is_empty()
    }

    /// Attributes rendered as `"wool fabric, slim fit"`, skipping empty values.
    #[must_use]
    pub fn attribute_summary(&self) -> Option<String> {
        let parts: Vec<String> = self
            .garment_attributes
            .iter()
            .filter(|a| {
                let value = a.value.trim();
                !value.is_empty() && !EMPTY_ATTRIBUTE_VALUES.contains(&value.to_lowercase().as_str())
            })
            .map(|a| format!("{} {}", a.value.trim(), a.name))
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    /// Palette rendered as `"navy and white"`.
    #[must_use]
    pub fn color_summary(&self) -> Option<String> {
        if self.selected_colors.is_empty() {
            None
        } else {
            Some(self.selected_colors.join(" and "))
        }
    }
}
