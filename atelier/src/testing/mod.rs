//! Testing utilities for atelier.
//!
//! This module provides:
//! - A scripted inference client
//! - A clock that records delays instead of sleeping
//! - Brief and studio fixtures

mod fixtures;
mod mocks;

pub use fixtures::{sample_brief, studio_with, StudioFixture};
pub use mocks::{RecordingSleeper, ScriptedClient};
