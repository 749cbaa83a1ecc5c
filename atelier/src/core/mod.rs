//! Core domain model types for atelier.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Job kind and provider status enums
//! - Pipeline stage ordering
//! - Artifacts, angle views and reference assets
//! - The design brief supplied by the caller

mod artifact;
mod brief;
mod stage;
mod status;

pub use artifact::{AngleSet, AngleView, Artifact, ReferenceAsset, StageOutput};
pub use brief::{DesignBrief, GarmentAttribute};
pub use stage::Stage;
pub use status::{JobKind, PredictionStatus};
