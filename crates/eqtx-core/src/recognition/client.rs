//! Recognition request/response handling.

use tracing::{debug, info};

use eqtx_inference::{GenerateRequest, GenerateResponse, InferenceService};

use super::prompt::RECOGNITION_PROMPT;
use crate::error::{EqtxError, Result};
use crate::input::ImageInput;
use crate::reply::ServiceReply;

/// Outcome of one recognition round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionResult {
    /// Fence-stripped text of the first candidate.
    Markup(String),
    /// The service answered without any usable candidate.
    Empty,
    /// Transport or service failure, with a user-presentable message.
    ServiceError(String),
}

impl RecognitionResult {
    /// Classify a raw service reply.
    pub fn from_reply(reply: eqtx_inference::Result<GenerateResponse>) -> Self {
        ServiceReply::classify(reply).into()
    }

    /// Whether the service answered at all (successfully parsed reply).
    pub fn is_reply(&self) -> bool {
        !matches!(self, RecognitionResult::ServiceError(_))
    }
}

impl From<ServiceReply> for RecognitionResult {
    fn from(reply: ServiceReply) -> Self {
        match reply {
            ServiceReply::Text(markup) => RecognitionResult::Markup(markup),
            ServiceReply::Empty => RecognitionResult::Empty,
            ServiceReply::ServiceError(message) => RecognitionResult::ServiceError(message),
        }
    }
}

/// Client sending an image with the recognition prompt.
pub struct RecognitionClient<'a, S: InferenceService + ?Sized> {
    service: &'a S,
    model: String,
}

impl<'a, S: InferenceService + ?Sized> RecognitionClient<'a, S> {
    /// Create a client for `model`.
    pub fn new(service: &'a S, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
        }
    }

    /// Build the multimodal request for `image`.
    pub fn request_for(&self, image: &ImageInput) -> GenerateRequest {
        GenerateRequest::with_image(
            self.model.clone(),
            RECOGNITION_PROMPT,
            image.mime_type.clone(),
            image.base64(),
        )
    }

    /// Transcribe `image` into markup.
    ///
    /// Fails with [`EqtxError::MissingCredential`] before any network
    /// attempt when the service has no credential.
    pub async fn recognize(&self, image: &ImageInput) -> Result<RecognitionResult> {
        if !self.service.is_configured() {
            return Err(EqtxError::MissingCredential);
        }

        info!(
            "Recognizing {} image ({} bytes) with {}",
            image.mime_type,
            image.bytes.len(),
            self.model
        );

        let request = self.request_for(image);
        let result = RecognitionResult::from_reply(self.service.generate(&request).await);

        match &result {
            RecognitionResult::Markup(markup) => debug!("Recognized {} chars of markup", markup.len()),
            RecognitionResult::Empty => debug!("Service returned no candidates"),
            RecognitionResult::ServiceError(_) => {}
        }

        Ok(result)
    }
}
