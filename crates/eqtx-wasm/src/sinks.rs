//! Browser clipboard, viewer window and anchor downloads.

use async_trait::async_trait;
use js_sys::{Array, Function, Object, Reflect, Uint8Array};
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use eqtx_core::export::{RasterImage, viewer_page};
use eqtx_core::{FileSink, ImageClipboard, ImageViewer, SinkError, TextClipboard};

use crate::dom::{document, js_message};

fn write_failed(value: JsValue) -> SinkError {
    SinkError::WriteFailed(js_message(&value))
}

pub(crate) fn blob(bytes: &[u8], mime_type: &str) -> Result<Blob, JsValue> {
    let parts = Array::of1(&Uint8Array::from(bytes));
    let options = BlobPropertyBag::new();
    options.set_type(mime_type);
    Blob::new_with_u8_array_sequence_and_options(&parts, &options)
}

/// `navigator.clipboard`, if the page may use it.
fn clipboard() -> Option<JsValue> {
    let window = web_sys::window()?;
    let clipboard = Reflect::get(&window.navigator(), &"clipboard".into()).ok()?;
    (!clipboard.is_undefined() && !clipboard.is_null()).then_some(clipboard)
}

async fn call_clipboard(method: &str, argument: &JsValue) -> Result<(), SinkError> {
    let clipboard = clipboard().ok_or(SinkError::Unavailable("clipboard"))?;
    let function: Function = Reflect::get(&clipboard, &method.into())
        .ok()
        .and_then(|f| f.dyn_into().ok())
        .ok_or(SinkError::Unavailable("clipboard"))?;

    let promise: js_sys::Promise = function
        .call1(&clipboard, argument)
        .map_err(write_failed)?
        .dyn_into()
        .map_err(write_failed)?;
    JsFuture::from(promise).await.map_err(write_failed)?;
    Ok(())
}

/// `navigator.clipboard` with `ClipboardItem` support.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserClipboard;

#[async_trait(?Send)]
impl ImageClipboard for BrowserClipboard {
    async fn write_image(&self, image: &RasterImage) -> Result<(), SinkError> {
        let constructor: Function = Reflect::get(&js_sys::global(), &"ClipboardItem".into())
            .ok()
            .and_then(|c| c.dyn_into().ok())
            .ok_or(SinkError::Unavailable("image clipboard"))?;

        let data = Object::new();
        let png = blob(&image.png, "image/png").map_err(write_failed)?;
        Reflect::set(&data, &"image/png".into(), &png).map_err(write_failed)?;
        let item = Reflect::construct(&constructor, &Array::of1(&data)).map_err(write_failed)?;

        call_clipboard("write", &Array::of1(&item).into()).await
    }
}

#[async_trait(?Send)]
impl TextClipboard for BrowserClipboard {
    async fn write_text(&self, text: &str) -> Result<(), SinkError> {
        call_clipboard("writeText", &JsValue::from_str(text)).await
    }
}

/// Opens the bitmap in a new window with copy instructions.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowViewer;

#[async_trait(?Send)]
impl ImageViewer for WindowViewer {
    async fn show_image(&self, image: &RasterImage) -> Result<(), SinkError> {
        let window = web_sys::window().ok_or(SinkError::Unavailable("image viewer"))?;
        let opened = window
            .open()
            .map_err(write_failed)?
            .ok_or(SinkError::Unavailable("image viewer"))?;

        let png = blob(&image.png, "image/png").map_err(write_failed)?;
        let url = Url::create_object_url_with_blob(&png).map_err(write_failed)?;

        let body = opened
            .document()
            .and_then(|d| d.body())
            .ok_or(SinkError::Unavailable("image viewer"))?;
        body.set_inner_html(&viewer_page(&url));
        debug!("Opened viewer for {}x{} image", image.width, image.height);
        Ok(())
    }
}

/// Triggers a download through a temporary anchor element.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnchorDownload;

#[async_trait(?Send)]
impl FileSink for AnchorDownload {
    async fn save(&self, file_name: &str, mime_type: &str, bytes: &[u8]) -> Result<(), SinkError> {
        let document = document().map_err(|_| SinkError::Unavailable("file download"))?;
        let body = document
            .body()
            .ok_or(SinkError::Unavailable("file download"))?;

        let data = blob(bytes, mime_type).map_err(write_failed)?;
        let url = Url::create_object_url_with_blob(&data).map_err(write_failed)?;

        let anchor: HtmlAnchorElement = document
            .create_element("a")
            .map_err(write_failed)?
            .dyn_into()
            .map_err(|_| SinkError::WriteFailed("anchor element".to_string()))?;
        anchor.set_href(&url);
        anchor.set_download(file_name);
        body.append_child(&anchor).map_err(write_failed)?;
        anchor.click();
        anchor.remove();
        Url::revoke_object_url(&url).map_err(write_failed)?;

        debug!("Downloaded {} ({} bytes)", file_name, bytes.len());
        Ok(())
    }
}
