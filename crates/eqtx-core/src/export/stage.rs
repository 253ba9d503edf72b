//! Off-screen staging of the rendered preview.

use serde::{Deserialize, Serialize};

use super::geometry::{ContentBoundingBox, LeafBox, Rect};

/// A live, laid-out preview of typeset markup.
///
/// Browser hosts back this with the DOM; native hosts with an estimated
/// layout of the engine's HTML.
pub trait RenderedPreview {
    /// Top-left corner of the preview node in viewport coordinates.
    fn origin(&self) -> (f64, f64);

    /// Every textual leaf of the preview with its viewport rectangle.
    fn leaf_boxes(&self) -> Vec<LeafBox>;

    /// Serialized markup of the preview node.
    fn markup(&self) -> String;

    /// Style rules of the active typesetting engine.
    fn engine_styles(&self) -> String;
}

/// A clone of the preview stripped of positioning chrome and resized to
/// the measured content bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedClone {
    /// Wrapper element containing the cloned preview markup.
    pub markup: String,
    /// The measured bound the clone was sized to, in viewport coordinates.
    pub bounds: ContentBoundingBox,
    /// Leaves relative to the clone's top-left corner.
    pub leaves: Vec<LeafBox>,
}

impl StagedClone {
    /// Clone `preview` into a wrapper of exactly `bounds`.
    pub fn stage(preview: &dyn RenderedPreview, bounds: ContentBoundingBox) -> Self {
        let (origin_x, origin_y) = preview.origin();
        let shift_x = origin_x - bounds.min_x;
        let shift_y = origin_y - bounds.min_y;

        let markup = format!(
            concat!(
                r#"<div class="eqtx-staged" style="position:static;margin:0;padding:0;border:none;"#,
                r#"display:inline-block;width:{}px;height:{}px;overflow:hidden;">"#,
                r#"<div style="position:relative;left:{}px;top:{}px;">{}</div></div>"#
            ),
            bounds.pixel_width(),
            bounds.pixel_height(),
            format_px(shift_x),
            format_px(shift_y),
            preview.markup()
        );

        let leaves = preview
            .leaf_boxes()
            .into_iter()
            .filter(LeafBox::contributes)
            .map(|leaf| LeafBox {
                rect: leaf.rect.translate(-bounds.min_x, -bounds.min_y),
                text: leaf.text,
            })
            .collect();

        Self {
            markup,
            bounds,
            leaves,
        }
    }

    /// The clone's own box, anchored at the origin.
    pub fn frame(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.bounds.pixel_width() as f64,
            self.bounds.pixel_height() as f64,
        )
    }
}

fn format_px(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Fixed preview with known geometry.
    pub struct FixedPreview {
        pub origin: (f64, f64),
        pub leaves: Vec<LeafBox>,
        pub markup: String,
        pub styles: String,
    }

    impl FixedPreview {
        pub fn equation() -> Self {
            Self {
                origin: (100.0, 50.0),
                leaves: vec![
                    LeafBox::new("E", Rect::new(120.0, 70.0, 12.0, 20.0)),
                    LeafBox::new("=", Rect::new(136.0, 74.0, 10.0, 12.0)),
                    LeafBox::new("mc", Rect::new(150.0, 70.0, 24.0, 20.0)),
                    LeafBox::new("2", Rect::new(174.0, 64.0, 7.5, 10.0)),
                    LeafBox::new("", Rect::new(100.0, 50.0, 600.0, 80.0)),
                ],
                markup: r#"<span class="katex-display">E=mc^2</span>"#.to_string(),
                styles: ".katex{font:normal 1.21em KaTeX_Main}".to_string(),
            }
        }
    }

    impl RenderedPreview for FixedPreview {
        fn origin(&self) -> (f64, f64) {
            self.origin
        }

        fn leaf_boxes(&self) -> Vec<LeafBox> {
            self.leaves.clone()
        }

        fn markup(&self) -> String {
            self.markup.clone()
        }

        fn engine_styles(&self) -> String {
            self.styles.clone()
        }
    }
}
