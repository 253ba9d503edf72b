//! Configuration structures for the transcription pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use eqtx_inference::{GeminiOptions, DEFAULT_BASE_URL};

/// Main configuration for the eqtx pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EqtxConfig {
    /// Inference service configuration.
    pub service: ServiceConfig,

    /// Typesetting configuration.
    pub typeset: TypesetConfig,

    /// Export configuration.
    pub export: ExportConfig,

    /// Timing of transient UI affordances.
    pub ui: UiConfig,
}

/// Inference service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// API key. Takes precedence over the environment variable.
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,

    /// API root.
    pub base_url: String,

    /// Model used to transcribe images.
    pub recognition_model: String,

    /// Model used to explain recognized equations.
    pub explanation_model: String,

    /// Language the explanation is written in.
    pub explanation_language: String,

    /// Request timeout in seconds. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            recognition_model: "gemini-2.0-flash".to_string(),
            explanation_model: "gemini-2.5-flash".to_string(),
            explanation_language: "Japanese".to_string(),
            timeout_secs: None,
        }
    }
}

impl ServiceConfig {
    /// Resolve the credential: explicit value first, then the environment.
    /// Empty strings count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
    }

    /// Connection options for the HTTP backend.
    pub fn gemini_options(&self) -> GeminiOptions {
        GeminiOptions {
            api_key: self.resolve_api_key(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Typesetting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypesetConfig {
    /// Macros made available to every render.
    pub macros: BTreeMap<String, String>,

    /// Allow trusted commands in the recognition preview.
    pub trust: bool,
}

impl Default for TypesetConfig {
    fn default() -> Self {
        let mut macros = BTreeMap::new();
        macros.insert(r"\bm".to_string(), r"\boldsymbol".to_string());
        Self {
            macros,
            trust: true,
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Width of the fixed vector canvas.
    pub canvas_width: u32,

    /// Height of the fixed vector canvas.
    pub canvas_height: u32,

    /// Offset of the embedded content inside the vector canvas.
    pub canvas_offset: u32,

    /// Supersampling factor for raster capture. Values below 2 are raised to 2.
    pub supersample: u32,

    /// File name of the downloaded vector document.
    pub vector_file_name: String,

    /// File name of the downloaded bitmap.
    pub raster_file_name: String,

    /// Typesetting engine stylesheet embedded into vector documents (native hosts).
    pub stylesheet: Option<PathBuf>,

    /// Font size of the preview in CSS pixels (native layout estimate).
    pub preview_font_px: f64,

    /// Directory downloads are written to (native hosts).
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 200,
            canvas_offset: 10,
            supersample: 2,
            vector_file_name: "formula.svg".to_string(),
            raster_file_name: "equation.png".to_string(),
            stylesheet: None,
            preview_font_px: 19.36,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ExportConfig {
    /// Supersampling factor actually used for capture.
    pub fn effective_supersample(&self) -> u32 {
        self.supersample.max(2)
    }
}

/// Timing of transient UI affordances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Delay before a completed progress indicator resets to zero.
    pub progress_reset_ms: u64,

    /// How long a success notification stays visible.
    pub notification_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            progress_reset_ms: 500,
            notification_ms: 3000,
        }
    }
}

impl EqtxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
