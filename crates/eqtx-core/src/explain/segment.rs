//! Splitting an explanation into plain text and inline math.
//!
//! Segmentation is a total, order-preserving partition: concatenating every
//! segment's source text gives back the input exactly.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::typeset::{RenderOptions, TypesetAdapter, Typesetter};

/// Character delimiting inline math on both sides.
pub const MATH_DELIMITER: char = '$';

lazy_static! {
    static ref INLINE_MATH: Regex = Regex::new(r"\$[\s\S]*?\$").unwrap();
}

/// One contiguous unit of an explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "source", rename_all = "snake_case")]
pub enum ExplanationSegment {
    /// Prose, possibly empty.
    PlainText(String),
    /// Inline math including both delimiters.
    MathSpan(String),
}

impl ExplanationSegment {
    /// The exact substring of the explanation this segment covers.
    pub fn source(&self) -> &str {
        match self {
            ExplanationSegment::PlainText(text) | ExplanationSegment::MathSpan(text) => text,
        }
    }

    /// Markup between the delimiters of a math span.
    pub fn math(&self) -> Option<&str> {
        match self {
            ExplanationSegment::MathSpan(source) => {
                let inner = source.strip_prefix(MATH_DELIMITER)?;
                inner.strip_suffix(MATH_DELIMITER)
            }
            ExplanationSegment::PlainText(_) => None,
        }
    }
}

/// Split `text` at leftmost-first, non-overlapping delimiter pairs.
///
/// A plain-text segment is emitted before every math span and after the last
/// one, even when empty. An unpaired delimiter stays in plain text.
pub fn segment_explanation(text: &str) -> Vec<ExplanationSegment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for found in INLINE_MATH.find_iter(text) {
        segments.push(ExplanationSegment::PlainText(text[last..found.start()].to_string()));
        segments.push(ExplanationSegment::MathSpan(found.as_str().to_string()));
        last = found.end();
    }
    segments.push(ExplanationSegment::PlainText(text[last..].to_string()));

    segments
}

/// A segment together with its typeset form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSegment {
    pub segment: ExplanationSegment,
    /// HTML for math spans that rendered. `None` for prose and for spans
    /// that failed, which display their literal source instead.
    pub html: Option<String>,
}

impl RenderedSegment {
    /// An unrendered prose segment.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            segment: ExplanationSegment::PlainText(text.into()),
            html: None,
        }
    }

    /// Whether this is a math span that fell back to literal text.
    pub fn is_degraded(&self) -> bool {
        matches!(self.segment, ExplanationSegment::MathSpan(_)) && self.html.is_none()
    }

    /// Text to show when the host cannot display HTML.
    pub fn display_text(&self) -> &str {
        self.segment.source()
    }
}

/// Typeset each math span independently in inline mode.
///
/// A span that fails degrades to its literal delimited text; its siblings
/// are unaffected.
pub fn render_segments<T: Typesetter>(
    segments: Vec<ExplanationSegment>,
    typesetter: &TypesetAdapter<T>,
) -> Vec<RenderedSegment> {
    let options = RenderOptions::inline();

    segments
        .into_iter()
        .map(|segment| {
            let html = segment.math().and_then(|math| {
                let rendered = typesetter.render(math, &options);
                if rendered.is_none() {
                    debug!("Inline math {:?} falls back to literal text", segment.source());
                }
                rendered
            });
            RenderedSegment { segment, html }
        })
        .collect()
}
