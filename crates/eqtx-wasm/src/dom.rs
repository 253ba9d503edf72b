//! DOM-backed preview measurement and html2canvas capture.

use async_trait::async_trait;
use image::RgbaImage;
use js_sys::{Object, Promise, Reflect};
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, CssStyleSheet, Document, Element, HtmlCanvasElement, HtmlElement,
};

use eqtx_core::export::{CaptureOptions, LeafBox, Rect, StagedClone};
use eqtx_core::{ExportError, Rasterizer, RenderedPreview};

/// `NodeFilter.SHOW_TEXT`.
const SHOW_TEXT: u32 = 0x4;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = html2canvas)]
    fn html2canvas(element: &HtmlElement, options: &JsValue) -> Promise;
}

pub(crate) fn js_message(value: &JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|err| String::from(err.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

pub(crate) fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

/// The live preview element on the page.
pub struct DomPreview {
    element: Element,
}

impl DomPreview {
    pub fn new(element: Element) -> Self {
        Self { element }
    }
}

impl RenderedPreview for DomPreview {
    fn origin(&self) -> (f64, f64) {
        let rect = self.element.get_bounding_client_rect();
        (rect.left(), rect.top())
    }

    fn leaf_boxes(&self) -> Vec<LeafBox> {
        let Ok(document) = document() else {
            return Vec::new();
        };
        let Ok(walker) = document.create_tree_walker_with_what_to_show(&self.element, SHOW_TEXT)
        else {
            return Vec::new();
        };
        let Ok(range) = document.create_range() else {
            return Vec::new();
        };

        let mut leaves = Vec::new();
        while let Ok(Some(node)) = walker.next_node() {
            let text = node.text_content().unwrap_or_default();
            if range.select_node_contents(&node).is_err() {
                continue;
            }
            let rect = range.get_bounding_client_rect();
            leaves.push(LeafBox::new(
                text,
                Rect::new(rect.left(), rect.top(), rect.width(), rect.height()),
            ));
        }
        debug!("Measured {} text nodes", leaves.len());
        leaves
    }

    fn markup(&self) -> String {
        self.element.outer_html()
    }

    fn engine_styles(&self) -> String {
        let Ok(document) = document() else {
            return String::new();
        };
        let sheets = document.style_sheets();
        let mut rules = Vec::new();

        for i in 0..sheets.length() {
            let Some(sheet) = sheets.item(i) else {
                continue;
            };
            let is_katex = sheet.href().ok().flatten().is_some_and(|href| href.contains("katex"));
            if !is_katex {
                continue;
            }
            let Ok(sheet) = sheet.dyn_into::<CssStyleSheet>() else {
                continue;
            };
            // Cross-origin sheets refuse access to their rules.
            let Ok(list) = sheet.css_rules() else {
                continue;
            };
            for j in 0..list.length() {
                if let Some(rule) = list.item(j) {
                    rules.push(rule.css_text());
                }
            }
        }
        rules.join("\n")
    }
}

/// Captures staged clones with the page's global `html2canvas`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Html2CanvasRasterizer;

fn capture_error(value: JsValue) -> ExportError {
    ExportError::CaptureFailure(js_message(&value))
}

fn capture_options(options: &CaptureOptions) -> Result<JsValue, JsValue> {
    let object = Object::new();
    let background = if options.transparent {
        JsValue::NULL
    } else {
        JsValue::from_str("#ffffff")
    };
    Reflect::set(&object, &"backgroundColor".into(), &background)?;
    Reflect::set(&object, &"scale".into(), &JsValue::from(options.scale))?;
    Reflect::set(&object, &"useCORS".into(), &JsValue::TRUE)?;
    Reflect::set(&object, &"logging".into(), &JsValue::FALSE)?;
    Ok(object.into())
}

#[async_trait(?Send)]
impl Rasterizer for Html2CanvasRasterizer {
    async fn capture(
        &self,
        staged: &StagedClone,
        options: &CaptureOptions,
    ) -> Result<RgbaImage, ExportError> {
        let document = document().map_err(capture_error)?;
        let body = document
            .body()
            .ok_or_else(|| ExportError::CaptureFailure("no document body".to_string()))?;

        let container: HtmlElement = document
            .create_element("div")
            .map_err(capture_error)?
            .dyn_into()
            .map_err(|_| ExportError::CaptureFailure("staging container".to_string()))?;
        container
            .style()
            .set_css_text("position:fixed;left:-10000px;top:0;pointer-events:none;");
        container.set_inner_html(&staged.markup);
        body.append_child(&container).map_err(capture_error)?;

        let result = async {
            let target: HtmlElement = container
                .first_element_child()
                .ok_or_else(|| ExportError::CaptureFailure("empty staged clone".to_string()))?
                .dyn_into()
                .map_err(|_| ExportError::CaptureFailure("staged clone".to_string()))?;

            let canvas: HtmlCanvasElement =
                JsFuture::from(html2canvas(&target, &capture_options(options).map_err(capture_error)?))
                    .await
                    .map_err(capture_error)?
                    .dyn_into()
                    .map_err(|_| ExportError::CaptureFailure("html2canvas returned no canvas".to_string()))?;

            let context: CanvasRenderingContext2d = canvas
                .get_context("2d")
                .map_err(capture_error)?
                .ok_or_else(|| ExportError::CaptureFailure("no 2d context".to_string()))?
                .dyn_into()
                .map_err(|_| ExportError::CaptureFailure("no 2d context".to_string()))?;

            let (width, height) = (canvas.width(), canvas.height());
            let data = context
                .get_image_data(0.0, 0.0, width as f64, height as f64)
                .map_err(capture_error)?;
            RgbaImage::from_raw(width, height, data.data().0).ok_or_else(|| {
                ExportError::CaptureFailure("pixel buffer size mismatch".to_string())
            })
        }
        .await;

        container.remove();
        result
    }
}
