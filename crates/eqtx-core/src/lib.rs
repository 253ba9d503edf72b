//! Core library for equation transcription and export.
//!
//! This crate provides:
//! - Image acquisition from file pickers, drag-and-drop and paste
//! - Recognition of an equation image into LaTeX through a multimodal model
//! - Failure-isolated typesetting of the recognized markup
//! - Natural-language explanations with inline-rendered math
//! - Export of the rendered equation as an SVG document or a cropped bitmap
//! - The per-view session and the orchestrator driving it

pub mod error;
pub mod explain;
pub mod export;
pub mod input;
pub mod models;
#[cfg(feature = "native")]
pub mod native;
pub mod pipeline;
pub mod recognition;
pub mod reply;
pub mod typeset;

pub use error::{EqtxError, ExportError, Result, SinkError, TypesetError};
pub use explain::{ExplanationComposer, ExplanationSegment, RenderedSegment, segment_explanation};
pub use export::{
    DeliverySinks, ExportArtifact, ExportEngine, ExportOutcome, FileSink, ImageClipboard,
    ImageViewer, Rasterizer, RenderedPreview, TextClipboard,
};
pub use input::{ImageInput, InputItem, InputSource, PreviewRef, select_image};
pub use models::config::EqtxConfig;
pub use models::session::{EquationSession, ExportFormat, ExportMode, RequestTicket};
pub use pipeline::Transcoder;
pub use recognition::{RecognitionClient, RecognitionResult, strip_code_fence};
pub use reply::ServiceReply;
pub use typeset::{RenderOptions, TypesetAdapter, Typesetter};

#[cfg(feature = "native")]
pub use native::{EstimatedPreview, ResvgRasterizer};
#[cfg(feature = "native")]
pub use typeset::KatexTypesetter;

/// Re-export the inference layer.
pub use eqtx_inference::{GeminiBackend, GeminiOptions, InferenceError, InferenceService};
