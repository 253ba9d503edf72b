//! Classification of raw inference-service replies.

use tracing::warn;

use eqtx_inference::GenerateResponse;

use crate::recognition::strip_code_fence;

/// One service round trip, validated at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceReply {
    /// Fence-stripped text of the first candidate.
    Text(String),
    /// The service answered without any usable candidate.
    Empty,
    /// Transport or service failure, with a user-presentable message.
    ServiceError(String),
}

impl ServiceReply {
    /// Classify a raw service reply.
    pub fn classify(reply: eqtx_inference::Result<GenerateResponse>) -> Self {
        match reply {
            Ok(response) => match response.first_text() {
                Some(text) => ServiceReply::Text(strip_code_fence(text).to_string()),
                None => ServiceReply::Empty,
            },
            Err(e) => {
                warn!("Inference request failed: {}", e);
                ServiceReply::ServiceError(e.to_string())
            }
        }
    }
}
