//! The design pipeline: stage ordering, advance and refine, downstream
//! invalidation and the edit history.
//!
//! ```text
//! prompt -> sketch -> colored -> model -> angles -> runway
//! ```
//!
//! Any populated stage may be refined in place, which clears every stage to
//! its right. The edit history only grows.

mod snapshot;
mod state;

pub use snapshot::{PipelineSnapshot, PROMPT_STATE};
pub use state::{DesignPipeline, StageRecord};
