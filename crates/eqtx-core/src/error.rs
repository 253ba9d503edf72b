//! Error types for the eqtx-core library.

use thiserror::Error;

/// Main error type for the eqtx library.
#[derive(Error, Debug)]
pub enum EqtxError {
    /// No service credential is configured. Raised before any network attempt.
    #[error("Gemini API key is missing. Set service.api_key in the config file or export the API key environment variable.")]
    MissingCredential,

    /// An action needing a source image was triggered without one.
    #[error("no image has been selected")]
    NoImage,

    /// An action needing recognized markup was triggered without it.
    #[error("no equation has been recognized")]
    NoMarkup,

    /// Failure talking to the inference service.
    #[error("transport error: {0}")]
    Transport(#[from] eqtx_inference::InferenceError),

    /// Export failure.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Clipboard or file sink failure outside the export chain.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by the typesetting engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypesetError {
    /// The markup could not be parsed.
    #[error("malformed markup: {0}")]
    Malformed(String),

    /// The engine itself failed (initialisation, options, runtime).
    #[error("typesetting engine failed: {0}")]
    Engine(String),
}

/// Errors related to exporting the rendered equation.
#[derive(Error, Debug)]
pub enum ExportError {
    /// There is no recognized markup to export.
    #[error("there is no equation to export")]
    NothingToExport,

    /// Measuring, staging or rasterizing the preview failed.
    #[error("capture failed: {0}")]
    CaptureFailure(String),

    /// Encoding the captured bitmap failed.
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// Saving the vector document failed.
    #[error("failed to save {file_name}: {source}")]
    Save {
        file_name: String,
        #[source]
        source: SinkError,
    },

    /// Every step of the clipboard fallback chain failed.
    #[error("all clipboard fallbacks failed: {0}")]
    DeliveryExhausted(String),
}

/// Errors reported by clipboard, viewer and file sinks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    /// The host does not provide this capability.
    #[error("{0} is not available")]
    Unavailable(&'static str),

    /// The capability exists but the write failed.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Result type for the eqtx library.
pub type Result<T> = std::result::Result<T, EqtxError>;
