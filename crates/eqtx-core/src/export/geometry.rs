//! Content-bound measurement.
//!
//! The true visual extent of a rendered preview is the union of its textual
//! leaf rectangles, which is tighter than the container's own box.

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// An axis-aligned rectangle in viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Finite coordinates and a strictly positive area.
    pub fn is_measurable(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// A rendered leaf (a text run) and where it landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafBox {
    pub text: String,
    pub rect: Rect,
}

impl LeafBox {
    pub fn new(text: impl Into<String>, rect: Rect) -> Self {
        Self {
            text: text.into(),
            rect,
        }
    }

    /// Leaves with zero area or no visible text do not count toward bounds.
    pub fn contributes(&self) -> bool {
        self.rect.is_measurable()
            && self
                .text
                .chars()
                .any(|c| !c.is_whitespace() && c != '\u{200b}')
    }
}

/// Minimal rectangle enclosing the rendered glyph content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentBoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl ContentBoundingBox {
    fn from_rect(rect: &Rect) -> Self {
        Self {
            min_x: rect.x,
            max_x: rect.right(),
            min_y: rect.y,
            max_y: rect.bottom(),
        }
    }

    fn union(self, rect: &Rect) -> Self {
        Self {
            min_x: self.min_x.min(rect.x),
            max_x: self.max_x.max(rect.right()),
            min_y: self.min_y.min(rect.y),
            max_y: self.max_y.max(rect.bottom()),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Width rounded up to whole pixels.
    pub fn pixel_width(&self) -> u32 {
        self.width().ceil().max(1.0) as u32
    }

    /// Height rounded up to whole pixels.
    pub fn pixel_height(&self) -> u32 {
        self.height().ceil().max(1.0) as u32
    }
}

/// Union of all contributing leaf rectangles.
///
/// Fails with [`ExportError::CaptureFailure`] when no leaf contributes.
pub fn measure_content(leaves: &[LeafBox]) -> Result<ContentBoundingBox, ExportError> {
    leaves
        .iter()
        .filter(|leaf| leaf.contributes())
        .fold(None, |acc: Option<ContentBoundingBox>, leaf| {
            Some(match acc {
                Some(bounds) => bounds.union(&leaf.rect),
                None => ContentBoundingBox::from_rect(&leaf.rect),
            })
        })
        .ok_or_else(|| ExportError::CaptureFailure("preview has no measurable content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_union_of_leaves() {
        let leaves = vec![
            LeafBox::new("E", Rect::new(10.0, 20.0, 8.0, 12.0)),
            LeafBox::new("=", Rect::new(20.0, 22.0, 6.0, 8.0)),
            LeafBox::new("2", Rect::new(40.0, 15.0, 5.0, 6.0)),
        ];

        assert_eq!(
            measure_content(&leaves).unwrap(),
            ContentBoundingBox {
                min_x: 10.0,
                max_x: 45.0,
                min_y: 15.0,
                max_y: 32.0,
            }
        );
    }

    #[test]
    fn test_empty_and_blank_leaves_ignored() {
        let leaves = vec![
            LeafBox::new("x", Rect::new(50.0, 50.0, 10.0, 10.0)),
            LeafBox::new("   ", Rect::new(0.0, 0.0, 500.0, 500.0)),
            LeafBox::new("\u{200b}", Rect::new(0.0, 0.0, 1.0, 300.0)),
            LeafBox::new("y", Rect::new(0.0, 0.0, 0.0, 10.0)),
            LeafBox::new("z", Rect::new(f64::NAN, 0.0, 10.0, 10.0)),
        ];

        let bounds = measure_content(&leaves).unwrap();
        assert_eq!(bounds.width(), 10.0);
        assert_eq!(bounds.height(), 10.0);
        assert_eq!((bounds.min_x, bounds.min_y), (50.0, 50.0));
    }

    #[test]
    fn test_nothing_measurable_is_capture_failure() {
        let err = measure_content(&[LeafBox::new("", Rect::new(0.0, 0.0, 10.0, 10.0))]).unwrap_err();
        assert!(matches!(err, ExportError::CaptureFailure(_)));
    }

    #[test]
    fn test_pixel_size_rounds_up() {
        let bounds = ContentBoundingBox {
            min_x: 0.0,
            max_x: 10.2,
            min_y: 0.0,
            max_y: 4.0,
        };
        assert_eq!((bounds.pixel_width(), bounds.pixel_height()), (11, 4));
    }
}
