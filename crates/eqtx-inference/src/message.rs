//! Request and response shapes for `generateContent`.
//!
//! Responses are validated here, at the boundary, so callers never have to
//! dereference optional fields themselves.

use serde::{Deserialize, Serialize};

/// A single generation request.
///
/// The model identifier travels in the request path, not in the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    #[serde(skip)]
    pub model: String,
    pub contents: Vec<Content>,
}

/// One turn of request content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// A request part: either prompt text or an inline image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64-encoded binary payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl GenerateRequest {
    /// Build a text-only request.
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: prompt.into(),
                }],
            }],
        }
    }

    /// Build a request carrying a prompt followed by one inline image.
    pub fn with_image(
        model: impl Into<String>,
        prompt: impl Into<String>,
        mime_type: impl Into<String>,
        base64_data: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.into(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.into(),
                            data: base64_data.into(),
                        },
                    },
                ],
            }],
        }
    }
}

/// Response body. Either `candidates` or `error` is normally present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub error: Option<ServiceErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

/// `{"error": {"message": ...}}` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl GenerateResponse {
    /// Build a response holding a single candidate with one text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: Some(vec![Candidate {
                content: Some(CandidateContent {
                    parts: Some(vec![ResponsePart {
                        text: Some(text.into()),
                    }]),
                }),
                finish_reason: None,
            }]),
            error: None,
        }
    }

    /// Text of the first part of the first candidate, if it is non-empty.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?
            .first()?
            .text
            .as_deref()
            .filter(|text| !text.is_empty())
    }

    /// Error message reported by the service, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}
