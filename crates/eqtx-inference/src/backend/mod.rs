//! Inference service implementations.

pub mod gemini;

use async_trait::async_trait;

use crate::{GenerateRequest, GenerateResponse, Result};

/// Trait for multimodal inference services.
///
/// This trait abstracts over the concrete generative backend so the pipeline
/// can run against the HTTP service, or an in-process stand-in in tests.
/// Futures are not required to be `Send`: the pipeline runs on a single
/// cooperative event loop, including inside the browser.
#[async_trait(?Send)]
pub trait InferenceService {
    /// Whether a credential is available. Callers check this before any
    /// network attempt.
    fn is_configured(&self) -> bool;

    /// Run one generation request.
    ///
    /// # Returns
    /// The decoded response body. Service-reported errors and non-success
    /// statuses are returned as `Err`.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}
