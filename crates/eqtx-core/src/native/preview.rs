//! Estimated layout of KaTeX HTML.

use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::ExportError;
use crate::export::{LeafBox, Rect, RenderedPreview};

/// Average glyph advance, in em.
const GLYPH_ADVANCE_EM: f64 = 0.55;

/// Portion of a glyph box above the baseline.
const ASCENT_EM: f64 = 0.75;

/// KaTeX relative sizes, indexed by `sizeN - 1`.
const SIZES: [f64; 11] = [
    0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.2, 1.44, 1.728, 2.074, 2.488,
];

/// A KaTeX preview laid out without a browser.
#[derive(Debug, Clone)]
pub struct EstimatedPreview {
    markup: String,
    leaves: Vec<LeafBox>,
    styles: String,
}

impl EstimatedPreview {
    /// Parse `markup` and estimate where each text run lands at `font_px`.
    pub fn layout(markup: &str, font_px: f64, styles: impl Into<String>) -> Result<Self, ExportError> {
        let root = parse(markup)?;
        let mut leaves = Vec::new();
        let mut pen = Pen {
            font_px,
            leaves: &mut leaves,
        };
        pen.place(&root, 0.0, font_px, 1.0);

        debug!("Estimated {} leaves at {}px", leaves.len(), font_px);
        Ok(Self {
            markup: markup.to_string(),
            leaves,
            styles: styles.into(),
        })
    }
}

impl RenderedPreview for EstimatedPreview {
    fn origin(&self) -> (f64, f64) {
        (0.0, 0.0)
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

#[derive(Debug, Default)]
struct Element {
    tag: String,
    classes: Vec<String>,
    style: String,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let mut element = Element {
            tag: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            ..Element::default()
        };
        for attr in start.attributes().flatten() {
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            match attr.key.as_ref() {
                b"class" => element.classes = value.split_whitespace().map(str::to_string).collect(),
                b"style" => element.style = value,
                _ => {}
            }
        }
        element
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// An `em` length from the inline style, e.g. `top:-3.063em`.
    fn style_em(&self, property: &str) -> Option<f64> {
        self.style.split(';').find_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            if name.trim() != property {
                return None;
            }
            f64::from_str(value.trim().strip_suffix("em")?).ok()
        })
    }

    /// Scale change applied by `sizing reset-sizeN sizeM` classes.
    fn size_factor(&self) -> f64 {
        let level = |prefix: &str| {
            self.classes.iter().find_map(|c| {
                let n: usize = c.strip_prefix(prefix)?.parse().ok()?;
                SIZES.get(n.checked_sub(1)?).copied()
            })
        };
        match (level("reset-size"), level("size")) {
            (Some(from), Some(to)) => to / from,
            _ => 1.0,
        }
    }

    fn is_invisible(&self) -> bool {
        self.tag == "svg"
            || self.has_class("katex-mathml")
            || self.has_class("strut")
            || self.has_class("pstrut")
    }
}

fn parse(markup: &str) -> Result<Element, ExportError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = false;

    let mut stack = vec![Element::default()];
    loop {
        let event = reader
            .read_event()
            .map_err(|e| ExportError::CaptureFailure(format!("unreadable preview markup: {}", e)))?;
        match event {
            Event::Start(start) => stack.push(Element::from_start(&start)),
            Event::Empty(start) => {
                let element = Element::from_start(&start);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Element(element));
                }
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    if let Some(element) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(Node::Element(element));
                        }
                    }
                }
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(value));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Unclosed elements are folded into their parents.
    while stack.len() > 1 {
        if let Some(element) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(Node::Element(element));
            }
        }
    }
    stack
        .pop()
        .ok_or_else(|| ExportError::CaptureFailure("empty preview markup".to_string()))
}

struct Pen<'a> {
    font_px: f64,
    leaves: &'a mut Vec<LeafBox>,
}

impl Pen<'_> {
    /// Lay out `element` with its left edge at `x` on `baseline`; returns
    /// the horizontal advance.
    fn place(&mut self, element: &Element, x: f64, baseline: f64, scale: f64) -> f64 {
        if element.is_invisible() {
            return 0.0;
        }

        let scale = scale * element.size_factor();
        let em = self.font_px * scale;
        let margin_left = element.style_em("margin-left").unwrap_or(0.0) * em;
        let margin_right = element.style_em("margin-right").unwrap_or(0.0) * em;
        let start = x + margin_left;

        let width = if element.has_class("vlist") {
            self.place_stack(element, start, baseline, scale)
        } else {
            let mut pen_x = start;
            for child in &element.children {
                pen_x += match child {
                    Node::Element(child) => self.place(child, pen_x, baseline, scale),
                    Node::Text(text) => self.place_text(text, pen_x, baseline, em),
                };
            }
            pen_x - start
        };

        margin_left + width + margin_right
    }

    /// Children of a `.vlist` share one left edge and are shifted vertically
    /// by their `top` plus the height of their strut.
    fn place_stack(&mut self, vlist: &Element, x: f64, baseline: f64, scale: f64) -> f64 {
        let em = self.font_px * scale;
        let mut width: f64 = 0.0;

        for child in &vlist.children {
            let Node::Element(row) = child else {
                continue;
            };
            let pstrut = row
                .children
                .iter()
                .find_map(|node| match node {
                    Node::Element(e) if e.has_class("pstrut") => e.style_em("height"),
                    _ => None,
                })
                .unwrap_or(0.0);
            let shift = (row.style_em("top").unwrap_or(0.0) + pstrut) * em;
            width = width.max(self.place(row, x, baseline + shift, scale));
        }

        width
    }

    fn place_text(&mut self, text: &str, x: f64, baseline: f64, em: f64) -> f64 {
        let visible: String = text.chars().filter(|&c| c != '\u{200b}').collect();
        let count = visible.chars().count();
        if count == 0 {
            return 0.0;
        }

        let width = count as f64 * GLYPH_ADVANCE_EM * em;
        self.leaves.push(LeafBox::new(
            visible,
            Rect::new(x, baseline - ASCENT_EM * em, width, em),
        ));
        width
    }
}
