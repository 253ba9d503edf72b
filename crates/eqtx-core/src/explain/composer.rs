//! Requesting an explanation of recognized markup.

use tracing::info;

use eqtx_inference::{GenerateRequest, InferenceService};

use super::segment::{RenderedSegment, render_segments, segment_explanation};
use crate::error::{EqtxError, Result};
use crate::models::session::NO_EXPLANATION_PLACEHOLDER;
use crate::recognition::explanation_prompt;
use crate::reply::ServiceReply;
use crate::typeset::{TypesetAdapter, Typesetter};

/// Asks the inference service for a short explanation and segments it.
pub struct ExplanationComposer<'a, S: InferenceService + ?Sized, T> {
    service: &'a S,
    typesetter: &'a TypesetAdapter<T>,
    model: String,
    language: String,
}

impl<'a, S: InferenceService + ?Sized, T: Typesetter> ExplanationComposer<'a, S, T> {
    pub fn new(
        service: &'a S,
        typesetter: &'a TypesetAdapter<T>,
        model: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            service,
            typesetter,
            model: model.into(),
            language: language.into(),
        }
    }

    /// Explain `markup`.
    ///
    /// Empty replies become a single "no explanation" segment and transport
    /// failures a single `Error: ...` segment; only a missing credential or
    /// missing markup is returned as an error.
    pub async fn explain(&self, markup: &str) -> Result<Vec<RenderedSegment>> {
        if markup.is_empty() {
            return Err(EqtxError::NoMarkup);
        }
        if !self.service.is_configured() {
            return Err(EqtxError::MissingCredential);
        }

        info!("Requesting explanation from {}", self.model);

        let request = GenerateRequest::text(self.model.clone(), explanation_prompt(&self.language, markup));
        let reply = ServiceReply::classify(self.service.generate(&request).await);

        Ok(match reply {
            ServiceReply::Text(text) => render_segments(segment_explanation(&text), self.typesetter),
            ServiceReply::Empty => vec![RenderedSegment::plain(NO_EXPLANATION_PLACEHOLDER)],
            ServiceReply::ServiceError(message) => {
                vec![RenderedSegment::plain(format!("Error: {}", message))]
            }
        })
    }
}
