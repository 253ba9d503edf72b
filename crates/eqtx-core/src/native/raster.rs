//! resvg-backed rasterizer for staged previews.

use async_trait::async_trait;
use image::RgbaImage;
use quick_xml::escape::escape;
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg;
use tracing::debug;

use crate::error::ExportError;
use crate::export::{CaptureOptions, Rasterizer, StagedClone};

/// Font stack used for glyph runs.
const FONT_FAMILY: &str = "KaTeX_Main, 'Times New Roman', serif";

/// Draws the staged leaves as SVG text and rasterizes them with resvg.
pub struct ResvgRasterizer {
    options: usvg::Options<'static>,
}

impl ResvgRasterizer {
    /// Create a rasterizer using the system fonts.
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        debug!("Loaded {} font faces", options.fontdb.len());
        Self { options }
    }

    /// SVG drawing of the staged clone in CSS pixels.
    pub fn scene(staged: &StagedClone) -> String {
        let frame = staged.frame();
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = frame.width,
            h = frame.height
        );
        for leaf in &staged.leaves {
            svg.push_str(&format!(
                r#"<text x="{:.2}" y="{:.2}" font-size="{:.2}" font-family="{}" fill="black">{}</text>"#,
                leaf.rect.x,
                leaf.rect.y + 0.75 * leaf.rect.height,
                leaf.rect.height,
                FONT_FAMILY,
                escape(leaf.text.as_str())
            ));
        }
        svg.push_str("</svg>");
        svg
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Rasterizer for ResvgRasterizer {
    async fn capture(
        &self,
        staged: &StagedClone,
        options: &CaptureOptions,
    ) -> Result<RgbaImage, ExportError> {
        let width = staged.bounds.pixel_width() * options.scale;
        let height = staged.bounds.pixel_height() * options.scale;

        let tree = usvg::Tree::from_str(&Self::scene(staged), &self.options)
            .map_err(|e| ExportError::CaptureFailure(e.to_string()))?;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            ExportError::CaptureFailure(format!("cannot allocate a {}x{} canvas", width, height))
        })?;
        if !options.transparent {
            pixmap.fill(Color::WHITE);
        }

        let scale = options.scale as f32;
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
        debug!("Rasterized {} leaves into {}x{}", staged.leaves.len(), width, height);

        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for pixel in pixmap.pixels() {
            let color = pixel.demultiply();
            rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| ExportError::CaptureFailure("pixel buffer size mismatch".to_string()))
    }
}
