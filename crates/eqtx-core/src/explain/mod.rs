//! Natural-language explanations with inline math.

mod composer;
mod segment;

pub use composer::ExplanationComposer;
pub use segment::{ExplanationSegment, MATH_DELIMITER, RenderedSegment, render_segments, segment_explanation};
