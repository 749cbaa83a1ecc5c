//! Artifact types produced by generation jobs.

use super::JobKind;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to a generated image or video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// URL returned by the provider.
    pub url: String,

    /// What kind of job produced it.
    pub kind: JobKind,

    /// When the job finished.
    pub produced_at: DateTime<Utc>,
}

impl Artifact {
    /// Creates an artifact stamped with the current time.
    #[must_use]
    pub fn new(url: impl Into<String>, kind: JobKind) -> Self {
        Self {
            url: url.into(),
            kind,
            produced_at: Utc::now(),
        }
    }
}

/// One generated camera angle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleView {
    /// Angle name, e.g. `front` or `three_quarter_back`.
    pub angle: String,
    /// URL of the generated view.
    pub image_url: String,
}

impl AngleView {
    /// Creates a new angle view.
    #[must_use]
    pub fn new(angle: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            angle: angle.into(),
            image_url: image_url.into(),
        }
    }
}

/// The settled result of a multi-angle fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleSet {
    /// Successful views, in request order.
    pub views: Vec<AngleView>,
    /// Number of views that were requested.
    pub requested: usize,
}

impl AngleSet {
    /// Number of views that succeeded.
    #[must_use]
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Looks up a view by angle name.
    #[must_use]
    pub fn view(&self, angle: &str) -> Option<&AngleView> {
        self.views.iter().find(|v| v.angle == angle)
    }

    /// Whether every requested angle produced a view.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.views.len() == self.requested
    }
}

/// The current artifact(s) held by one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageOutput {
    /// A single image or video.
    Single(Artifact),
    /// A set of angle views.
    Views(AngleSet),
}

impl StageOutput {
    /// The URL that represents this output downstream.
    ///
    /// For a view set this is the first successful view.
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        match self {
            Self::Single(artifact) => Some(&artifact.url),
            Self::Views(set) => set.views.first().map(|v| v.image_url.as_str()),
        }
    }

    /// Returns the single artifact, if this is one.
    #[must_use]
    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Single(artifact) => Some(artifact),
            Self::Views(_) => None,
        }
    }

    /// Returns the angle set, if this is one.
    #[must_use]
    pub fn as_views(&self) -> Option<&AngleSet> {
        match self {
            Self::Views(set) => Some(set),
            Self::Single(_) => None,
        }
    }
}

/// A caller-supplied reference image such as an uploaded logo.
///
/// Either a remote URL or an inline `data:` URI. Serialized as the plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReferenceAsset {
    /// A URL the provider can fetch.
    Url(String),
    /// An inline base64 data URI.
    DataUri(String),
}

impl ReferenceAsset {
    /// Wraps a URL.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self::from(url.into())
    }

    /// Encodes raw bytes as a base64 data URI.
    #[must_use]
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self::DataUri(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    /// The string passed to the provider.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(s) | Self::DataUri(s) => s,
        }
    }

    /// Whether the asset is carried inline.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::DataUri(_))
    }
}

impl From<String> for ReferenceAsset {
    fn from(raw: String) -> Self {
        if raw.starts_with("data:") {
            Self::DataUri(raw)
        } else {
            Self::Url(raw)
        }
    }
}

impl From<ReferenceAsset> for String {
    fn from(asset: ReferenceAsset) -> Self {
        match asset {
            ReferenceAsset::Url(s) | ReferenceAsset::DataUri(s) => s,
        }
    }
}

impl fmt::Display for ReferenceAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::DataUri(uri) => write!(f, "<inline image, {} bytes>", uri.len()),
        }
    }
}
