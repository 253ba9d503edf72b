//! Bitmap capture of the staged clone.

use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::debug;

use crate::error::ExportError;

use super::stage::StagedClone;

/// How a staged clone is rasterized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Device pixels per CSS pixel.
    pub scale: u32,
    /// Leave the background transparent.
    pub transparent: bool,
}

impl CaptureOptions {
    /// Transparent capture at `scale`, never below 2x.
    pub fn supersampled(scale: u32) -> Self {
        Self {
            scale: scale.max(2),
            transparent: true,
        }
    }
}

/// Draws a staged clone into pixels.
#[async_trait(?Send)]
pub trait Rasterizer {
    /// Rasterize at `options.scale`. The result may be larger than the
    /// staged bound; it is cropped afterwards.
    async fn capture(
        &self,
        staged: &StagedClone,
        options: &CaptureOptions,
    ) -> Result<RgbaImage, ExportError>;
}

/// An encoded bitmap ready for a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// PNG encoding.
    pub png: Vec<u8>,
    /// Straight RGBA pixels, row-major.
    pub pixels: Vec<u8>,
}

/// Crop a capture exactly to the staged bound at `scale`.
pub fn crop_to_bounds(
    capture: &RgbaImage,
    staged: &StagedClone,
    scale: u32,
) -> Result<RgbaImage, ExportError> {
    let width = staged.bounds.pixel_width() * scale;
    let height = staged.bounds.pixel_height() * scale;

    if capture.width() < width || capture.height() < height {
        return Err(ExportError::CaptureFailure(format!(
            "capture is {}x{} but the content needs {}x{}",
            capture.width(),
            capture.height(),
            width,
            height
        )));
    }

    debug!(
        "Cropping {}x{} capture to {}x{}",
        capture.width(),
        capture.height(),
        width,
        height
    );
    Ok(image::imageops::crop_imm(capture, 0, 0, width, height).to_image())
}

/// Encode pixels as PNG.
pub fn encode_png(pixels: RgbaImage) -> Result<RasterImage, ExportError> {
    let (width, height) = pixels.dimensions();
    let mut png = Vec::new();
    DynamicImage::ImageRgba8(pixels.clone())
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ExportError::Encode(e.to_string()))?;

    Ok(RasterImage {
        width,
        height,
        png,
        pixels: pixels.into_raw(),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use image::Rgba;

    /// Fills the staged frame (plus a margin of chrome) with a solid colour.
    pub struct SolidRasterizer {
        pub margin: u32,
    }

    #[async_trait(?Send)]
    impl Rasterizer for SolidRasterizer {
        async fn capture(
            &self,
            staged: &StagedClone,
            options: &CaptureOptions,
        ) -> Result<RgbaImage, ExportError> {
            let width = staged.bounds.pixel_width() * options.scale + self.margin;
            let height = staged.bounds.pixel_height() * options.scale + self.margin;
            Ok(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])))
        }
    }

    /// Always fails, as a broken capture library would.
    pub struct FailingRasterizer;

    #[async_trait(?Send)]
    impl Rasterizer for FailingRasterizer {
        async fn capture(
            &self,
            _staged: &StagedClone,
            _options: &CaptureOptions,
        ) -> Result<RgbaImage, ExportError> {
            Err(ExportError::CaptureFailure("canvas unavailable".to_string()))
        }
    }
}
