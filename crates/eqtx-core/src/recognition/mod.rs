//! Image-to-markup recognition through the inference service.

mod client;
mod fence;
mod prompt;

pub use client::{RecognitionClient, RecognitionResult};
pub use fence::strip_code_fence;
pub use prompt::{RECOGNITION_PROMPT, explanation_prompt};
