//! Typesetting adapter.
//!
//! The typesetting engine is an external collaborator. [`TypesetAdapter`]
//! wraps it so that a malformed expression, or an engine that panics, can
//! never propagate to the caller: failures come back as `None` and the
//! caller shows the raw source instead.

#[cfg(feature = "native")]
mod katex;

#[cfg(feature = "native")]
pub use self::katex::KatexTypesetter;

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use crate::error::TypesetError;
use crate::models::config::TypesetConfig;

/// Options for a single render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Block (display) layout instead of inline.
    pub display_mode: bool,
    /// Report recoverable errors inside the output instead of failing.
    pub error_tolerant: bool,
    /// Reject non-standard input.
    pub strict: bool,
    /// Allow trusted commands such as `\href`.
    pub trust: bool,
    /// Extra macro definitions.
    pub macros: BTreeMap<String, String>,
}

impl RenderOptions {
    /// Options for the recognized-equation preview.
    pub fn preview(config: &TypesetConfig) -> Self {
        Self {
            display_mode: true,
            error_tolerant: true,
            strict: false,
            trust: config.trust,
            macros: config.macros.clone(),
        }
    }

    /// Options for inline math inside an explanation.
    pub fn inline() -> Self {
        Self {
            display_mode: false,
            error_tolerant: false,
            strict: true,
            trust: false,
            macros: BTreeMap::new(),
        }
    }
}

/// A markup typesetting engine.
pub trait Typesetter {
    /// Render `source` to HTML markup.
    fn render(&self, source: &str, options: &RenderOptions) -> Result<String, TypesetError>;
}

impl<T: Typesetter + ?Sized> Typesetter for &T {
    fn render(&self, source: &str, options: &RenderOptions) -> Result<String, TypesetError> {
        (**self).render(source, options)
    }
}

/// Failure-isolating wrapper around a [`Typesetter`].
#[derive(Debug, Clone)]
pub struct TypesetAdapter<T> {
    engine: T,
}

impl<T: Typesetter> TypesetAdapter<T> {
    pub fn new(engine: T) -> Self {
        Self { engine }
    }

    /// Access the wrapped engine.
    pub fn engine(&self) -> &T {
        &self.engine
    }

    /// Render, returning `None` on any failure.
    pub fn render(&self, source: &str, options: &RenderOptions) -> Option<String> {
        match catch_unwind(AssertUnwindSafe(|| self.engine.render(source, options))) {
            Ok(Ok(markup)) => Some(markup),
            Ok(Err(e)) => {
                warn!("Typesetting failed: {}", e);
                None
            }
            Err(_) => {
                warn!("Typesetting engine panicked on {} chars of input", source.len());
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Engine that rejects unbalanced braces and wraps everything else.
    #[derive(Debug, Clone, Default)]
    pub struct BraceCheckingTypesetter;

    impl Typesetter for BraceCheckingTypesetter {
        fn render(&self, source: &str, options: &RenderOptions) -> Result<String, TypesetError> {
            let mut depth = 0i32;
            for c in source.chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
                if depth < 0 {
                    return Err(TypesetError::Malformed(format!("unexpected }} in {}", source)));
                }
            }
            if depth != 0 {
                return Err(TypesetError::Malformed(format!("unclosed {{ in {}", source)));
            }
            if source.contains(r"\panic") {
                panic!("engine crashed");
            }
            let class = if options.display_mode { "katex-display" } else { "katex" };
            Ok(format!("<span class=\"{}\">{}</span>", class, source))
        }
    }
}
