//! Native (non-browser) implementations of the preview and capture seams.
//!
//! Without a browser there is no layout engine, so the preview of KaTeX
//! HTML is laid out with an em-metric estimate and drawn with resvg.

mod preview;
mod raster;

pub use preview::EstimatedPreview;
pub use raster::ResvgRasterizer;
