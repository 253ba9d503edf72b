//! Multimodal inference-service abstraction for eqtx.
//!
//! This crate provides a unified interface for calling a generative model that
//! accepts combined image + text input and returns generated text:
//! - wire types mirroring the `generateContent` request/response shape
//! - the [`InferenceService`] trait the pipeline is written against
//! - [`GeminiBackend`], an HTTP implementation backed by `reqwest`
//!   (native with rustls, or the browser `fetch` API on wasm32)

mod backend;
mod error;
mod message;

pub use backend::InferenceService;
pub use backend::gemini::{GeminiBackend, GeminiOptions, DEFAULT_BASE_URL};
pub use error::InferenceError;
pub use message::{
    Candidate, CandidateContent, Content, GenerateRequest, GenerateResponse, InlineData, Part,
    ResponsePart, ServiceErrorBody,
};

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
