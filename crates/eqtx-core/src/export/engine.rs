//! Export orchestration: measure, stage, then download or copy.

use tracing::{debug, info};

use crate::error::ExportError;
use crate::models::config::ExportConfig;
use crate::models::session::{ExportFormat, ExportMode};

use super::delivery::{Delivery, DeliverySinks, deliver_to_clipboard};
use super::geometry::measure_content;
use super::raster::{CaptureOptions, RasterImage, Rasterizer, crop_to_bounds, encode_png};
use super::stage::{RenderedPreview, StagedClone};
use super::vector::{VECTOR_MIME_TYPE, vector_document};

/// What an export produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportArtifact {
    /// A serialized SVG document.
    VectorDocument(String),
    /// An encoded bitmap.
    RasterImage(RasterImage),
}

/// Result of a completed export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub artifact: ExportArtifact,
    /// Set for downloads: the file name the document was saved as.
    pub saved_as: Option<String>,
    /// Set for clipboard exports: the fallback step that succeeded.
    pub delivery: Option<Delivery>,
}

/// Turns a rendered preview into a downloadable or copyable artifact.
pub struct ExportEngine<'a> {
    config: &'a ExportConfig,
}

impl<'a> ExportEngine<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Measure and stage the preview, then serialize the vector document.
    pub fn prepare(
        &self,
        preview: &dyn RenderedPreview,
    ) -> Result<(StagedClone, String), ExportError> {
        let leaves = preview.leaf_boxes();
        let bounds = measure_content(&leaves)?;
        debug!(
            "Content bound {:.1}x{:.1} from {} leaves",
            bounds.width(),
            bounds.height(),
            leaves.len()
        );

        let staged = StagedClone::stage(preview, bounds);
        let document = vector_document(&staged, &preview.engine_styles(), self.config);
        Ok((staged, document))
    }

    /// Capture, crop and encode the staged clone.
    pub async fn rasterize(
        &self,
        staged: &StagedClone,
        rasterizer: &dyn Rasterizer,
    ) -> Result<RasterImage, ExportError> {
        let options = CaptureOptions::supersampled(self.config.effective_supersample());
        let capture = rasterizer.capture(staged, &options).await?;
        let cropped = crop_to_bounds(&capture, staged, options.scale)?;
        encode_png(cropped)
    }

    /// Export `markup` as rendered in `preview`.
    ///
    /// Measurement, capture and encoding failures abort before any sink is
    /// touched. Clipboard sink failures fall through the delivery chain.
    pub async fn export(
        &self,
        markup: &str,
        preview: &dyn RenderedPreview,
        mode: ExportMode,
        format: ExportFormat,
        rasterizer: &dyn Rasterizer,
        sinks: DeliverySinks<'_>,
    ) -> Result<ExportOutcome, ExportError> {
        if markup.trim().is_empty() {
            return Err(ExportError::NothingToExport);
        }
        debug!("Exporting with mode {:?}, format {:?}", mode, format);

        let (staged, document) = self.prepare(preview)?;

        match mode {
            ExportMode::Download => {
                let file_name = self.config.vector_file_name.clone();
                sinks
                    .files
                    .save(&file_name, VECTOR_MIME_TYPE, document.as_bytes())
                    .await
                    .map_err(|source| ExportError::Save {
                        file_name: file_name.clone(),
                        source,
                    })?;
                info!("Saved vector document as {}", file_name);

                Ok(ExportOutcome {
                    artifact: ExportArtifact::VectorDocument(document),
                    saved_as: Some(file_name),
                    delivery: None,
                })
            }
            ExportMode::Clipboard => {
                // Both formats copy a bitmap; the document is the text fallback.
                let image = self.rasterize(&staged, rasterizer).await?;
                let delivery =
                    deliver_to_clipboard(&image, &document, &self.config.raster_file_name, sinks)
                        .await?;

                Ok(ExportOutcome {
                    artifact: ExportArtifact::RasterImage(image),
                    saved_as: None,
                    delivery: Some(delivery),
                })
            }
        }
    }
}
