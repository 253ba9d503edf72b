//! KaTeX-backed typesetter (embedded JavaScript engine).

use tracing::debug;

use super::{RenderOptions, Typesetter};
use crate::error::TypesetError;

/// Renders LaTeX to HTML with KaTeX.
#[derive(Debug, Clone, Copy, Default)]
pub struct KatexTypesetter;

impl KatexTypesetter {
    pub fn new() -> Self {
        Self
    }

    fn opts(options: &RenderOptions) -> katex::Opts {
        let mut opts = katex::Opts::default();
        opts.set_display_mode(options.display_mode);
        opts.set_output_type(katex::OutputType::Html);
        opts.set_throw_on_error(!options.error_tolerant);
        opts.set_trust(options.trust);
        for (name, expansion) in &options.macros {
            opts.add_macro(name.clone(), expansion.clone());
        }
        opts
    }
}

impl Typesetter for KatexTypesetter {
    fn render(&self, source: &str, options: &RenderOptions) -> Result<String, TypesetError> {
        debug!(
            "KaTeX render ({} mode, {} chars)",
            if options.display_mode { "display" } else { "inline" },
            source.len()
        );

        katex::render_with_opts(source, &Self::opts(options)).map_err(|e| match e {
            katex::Error::JsExecError(message) => TypesetError::Malformed(message),
            other => TypesetError::Engine(other.to_string()),
        })
    }
}
