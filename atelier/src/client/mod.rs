//! The inference client: one network round trip per call, no retrying.
//!
//! This module provides:
//! - The `InferenceClient` trait the job runner drives
//! - Request, handle, rejection and status types
//! - An HTTP implementation (feature `http`)

#[cfg(feature = "http")]
mod http;
mod types;

#[cfg(feature = "http")]
pub use http::HttpInferenceClient;
pub use types::{GenerationRequest, JobHandle, Rejection, StatusReport};

use async_trait::async_trait;

/// A remote, asynchronous generation provider.
///
/// `submit` either returns a handle right away or a rejection; the job's
/// outcome is only learned later through `status`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Submits one generation request.
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, Rejection>;

    /// Checks the status of a previously accepted job.
    async fn status(&self, handle: &JobHandle) -> Result<StatusReport, Rejection>;
}
