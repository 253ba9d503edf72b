//! Export of the rendered equation as a vector document or a bitmap.
//!
//! Every export first measures the true content bound of the live preview
//! and stages a clone sized to it. Downloads then serialize the clone into
//! a self-contained SVG; clipboard exports rasterize it and walk the
//! clipboard fallback chain.

mod delivery;
mod engine;
mod geometry;
mod raster;
mod stage;
mod vector;

pub use delivery::{
    Delivery, DeliverySinks, DeliveryStep, FileSink, ImageClipboard, ImageViewer, TextClipboard,
    Unsupported, deliver_to_clipboard, viewer_page,
};
pub use engine::{ExportArtifact, ExportEngine, ExportOutcome};
pub use geometry::{ContentBoundingBox, LeafBox, Rect, measure_content};
pub use raster::{CaptureOptions, RasterImage, Rasterizer, crop_to_bounds, encode_png};
pub use stage::{RenderedPreview, StagedClone};
pub use vector::{KATEX_OVERRIDE_STYLE, VECTOR_MIME_TYPE, vector_document};

#[cfg(test)]
pub(crate) mod testing {
    pub use super::delivery::testing::RecordingSink;
    pub use super::raster::testing::{FailingRasterizer, SolidRasterizer};
    pub use super::stage::testing::FixedPreview;
}
