//! WASM bindings for equation transcription.
//!
//! This crate exposes the transcription session to the browser. The page
//! loads `katex` and `html2canvas` as globals; everything else (the Gemini
//! client, segmentation, export staging and the clipboard fallback chain)
//! runs in Rust.

mod dom;
mod katex;
mod sinks;

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Promise, Uint8Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{DataTransfer, Element, File, FileList, Url};

use eqtx_core::{
    DeliverySinks, EqtxConfig, EquationSession, ExportArtifact, ExportFormat, ExportMode,
    GeminiBackend, InputItem, InputSource, PreviewRef, Transcoder, select_image,
};

pub use dom::{DomPreview, Html2CanvasRasterizer};
pub use katex::BrowserKatex;
pub use sinks::{AnchorDownload, BrowserClipboard, WindowViewer};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_source(source: &str) -> InputSource {
    match source {
        "drop" | "drag" | "dragdrop" => InputSource::DragDrop,
        "paste" => InputSource::Paste,
        _ => InputSource::FilePicker,
    }
}

fn parse_mode(mode: &str) -> Result<ExportMode, JsValue> {
    match mode {
        "download" => Ok(ExportMode::Download),
        "clipboard" => Ok(ExportMode::Clipboard),
        other => Err(JsValue::from_str(&format!("unknown export mode: {}", other))),
    }
}

fn parse_format(format: &str) -> Result<ExportFormat, JsValue> {
    match format {
        "raster" => Ok(ExportFormat::Raster),
        "vector" => Ok(ExportFormat::Vector),
        other => Err(JsValue::from_str(&format!("unknown export format: {}", other))),
    }
}

async fn sleep(ms: u64) {
    let promise = Promise::new(&mut |resolve, _| {
        if let Some(window) = web_sys::window() {
            let _ = window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms as i32);
        }
    });
    let _ = JsFuture::from(promise).await;
}

async fn read_file(file: &File) -> Result<Vec<u8>, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

struct Inner {
    transcoder: Transcoder<GeminiBackend, BrowserKatex>,
    session: RefCell<EquationSession>,
}

impl Inner {
    /// Take the first image among `files` into the session.
    async fn acquire(&self, files: Vec<File>, source: InputSource) -> Result<bool, JsValue> {
        for file in files {
            let mime = file.type_();
            let item = InputItem {
                name: Some(file.name()),
                mime_type: (!mime.is_empty()).then_some(mime),
                bytes: read_file(&file).await?,
                preview: None,
            };
            if !item.is_image() {
                continue;
            }

            let url = Url::create_object_url_with_blob(&file)?;
            let Some(mut image) = select_image(vec![item], source) else {
                continue;
            };
            image.preview = PreviewRef::Url(url);

            let mut session = self.session.borrow_mut();
            if let Some(PreviewRef::Url(previous)) = session.source_image().map(|i| &i.preview) {
                let _ = Url::revoke_object_url(previous);
            }
            session.acquire(image);
            return Ok(true);
        }
        Ok(false)
    }
}

#[derive(Serialize)]
struct ExportSummary {
    kind: &'static str,
    saved_as: Option<String>,
    step: Option<String>,
    message: Option<String>,
}

/// One transcription view bound to the page.
#[wasm_bindgen]
pub struct EquationTranscoder {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl EquationTranscoder {
    /// Create a transcoder.
    ///
    /// `config` is an optional object in the configuration file format.
    #[wasm_bindgen(constructor)]
    pub fn new(api_key: Option<String>, config: JsValue) -> Result<EquationTranscoder, JsValue> {
        let mut config: EqtxConfig = if config.is_undefined() || config.is_null() {
            EqtxConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(js_error)?
        };
        if api_key.is_some() {
            config.service.api_key = api_key;
        }

        let backend = GeminiBackend::new(config.service.gemini_options()).map_err(js_error)?;
        Ok(Self {
            inner: Rc::new(Inner {
                transcoder: Transcoder::new(backend, BrowserKatex, config),
                session: RefCell::new(EquationSession::new()),
            }),
        })
    }

    /// Acquire from a file picker or a drop. `source` is `"picker"` or `"drop"`.
    /// Resolves to whether an image was found.
    pub fn acquire_files(&self, files: FileList, source: String) -> Promise {
        let inner = Rc::clone(&self.inner);
        let files: Vec<File> = (0..files.length()).filter_map(|i| files.get(i)).collect();
        future_to_promise(async move {
            let acquired = inner.acquire(files, parse_source(&source)).await?;
            Ok(JsValue::from_bool(acquired))
        })
    }

    /// Acquire from a paste event's clipboard data.
    pub fn acquire_clipboard(&self, data: DataTransfer) -> Promise {
        let inner = Rc::clone(&self.inner);
        let items = data.items();
        let files: Vec<File> = (0..items.length())
            .filter_map(|i| items.get(i))
            .filter(|item| item.kind() == "file" && item.type_().starts_with("image/"))
            .filter_map(|item| item.get_as_file().ok().flatten())
            .collect();
        future_to_promise(async move {
            let acquired = inner.acquire(files, InputSource::Paste).await?;
            Ok(JsValue::from_bool(acquired))
        })
    }

    /// Preview URL of the current image.
    #[wasm_bindgen(getter)]
    pub fn image_url(&self) -> Option<String> {
        match self.inner.session.borrow().source_image().map(|i| &i.preview) {
            Some(PreviewRef::Url(url)) => Some(url.clone()),
            _ => None,
        }
    }

    /// Recognize the current image. Progress resets after the configured delay.
    pub fn recognize(&self) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let started = inner
                .transcoder
                .begin_recognition(&mut inner.session.borrow_mut());
            let (ticket, image) = started.map_err(js_error)?;

            let result = inner.transcoder.run_recognition(&image).await;
            inner
                .transcoder
                .finish_recognition(&mut inner.session.borrow_mut(), &ticket, result);

            let reset = Rc::clone(&inner);
            wasm_bindgen_futures::spawn_local(async move {
                sleep(reset.transcoder.config().ui.progress_reset_ms).await;
                reset
                    .transcoder
                    .settle(&mut reset.session.borrow_mut(), &ticket);
            });

            let markup = inner.session.borrow().recognized_markup().to_string();
            Ok(JsValue::from_str(&markup))
        })
    }

    /// Explain the current markup. Resolves to the segments.
    pub fn explain(&self) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let started = inner
                .transcoder
                .begin_explanation(&mut inner.session.borrow_mut());
            let (ticket, markup) = started.map_err(js_error)?;

            let segments = inner.transcoder.run_explanation(&markup).await;
            inner
                .transcoder
                .finish_explanation(&mut inner.session.borrow_mut(), &ticket, segments);

            let session = inner.session.borrow();
            to_js(&session.explanation_segments())
        })
    }

    /// Copy the markup wrapped in `$$ ... $$`, or as is when `raw`.
    pub fn copy_markup(&self, raw: bool) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let markup = inner.session.borrow().recognized_markup().to_string();
            let (mut scratch, pending) = fork(&inner);
            let copied = inner
                .transcoder
                .copy_markup(&mut scratch, &BrowserClipboard, raw)
                .await;
            inner.session.borrow_mut().merge_feedback(scratch, pending);
            copied.map_err(js_error)?;
            Ok(JsValue::from_str(&markup))
        })
    }

    /// Export the equation rendered in `preview` using the current mode and format.
    pub fn export(&self, preview: Element) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let (mut scratch, pending) = fork(&inner);
            let exported = inner
                .transcoder
                .export(
                    &mut scratch,
                    &DomPreview::new(preview),
                    &Html2CanvasRasterizer,
                    DeliverySinks {
                        image_clipboard: &BrowserClipboard,
                        text_clipboard: &BrowserClipboard,
                        viewer: &WindowViewer,
                        files: &AnchorDownload,
                    },
                )
                .await;
            inner.session.borrow_mut().merge_feedback(scratch, pending);

            let outcome = exported.map_err(js_error)?;
            let kind = match outcome.artifact {
                ExportArtifact::VectorDocument(_) => "vector",
                ExportArtifact::RasterImage(_) => "raster",
            };
            to_js(&ExportSummary {
                kind,
                saved_as: outcome.saved_as,
                step: outcome.delivery.as_ref().map(|d| d.step.to_string()),
                message: outcome.delivery.map(|d| d.message),
            })
        })
    }

    /// Set markup directly (typed by the user), typesetting it.
    pub fn set_markup(&self, markup: &str) {
        self.inner
            .transcoder
            .set_markup(&mut self.inner.session.borrow_mut(), markup);
    }

    #[wasm_bindgen(getter)]
    pub fn recognized_markup(&self) -> String {
        self.inner.session.borrow().recognized_markup().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn typeset_preview(&self) -> Option<String> {
        self.inner.session.borrow().typeset_preview().map(str::to_string)
    }

    #[wasm_bindgen(getter)]
    pub fn explanation(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.session.borrow().explanation_segments())
    }

    #[wasm_bindgen(getter)]
    pub fn progress(&self) -> u8 {
        self.inner.session.borrow().progress()
    }

    /// The notification message while it is visible.
    #[wasm_bindgen(getter)]
    pub fn notification(&self) -> Option<String> {
        let session = self.inner.session.borrow();
        if session.notification_visible() {
            session.notification().map(|n| n.message.clone())
        } else {
            None
        }
    }

    /// Drain pending alerts; the page shows each with `alert()`.
    pub fn take_alerts(&self) -> Vec<String> {
        self.inner.session.borrow_mut().take_alerts()
    }

    pub fn set_export_mode(&self, mode: &str) -> Result<(), JsValue> {
        self.inner.session.borrow_mut().export_mode = parse_mode(mode)?;
        Ok(())
    }

    pub fn set_export_format(&self, format: &str) -> Result<(), JsValue> {
        self.inner.session.borrow_mut().export_format = parse_format(format)?;
        Ok(())
    }
}

/// Clone the live session for an action that awaits host capabilities.
/// Copy and export only raise feedback, which is merged back afterwards.
fn fork(inner: &Inner) -> (EquationSession, usize) {
    let session = inner.session.borrow();
    (session.clone(), session.alerts().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_parse_mode_and_format() {
        assert_eq!(parse_mode("clipboard").ok(), Some(ExportMode::Clipboard));
        assert_eq!(parse_format("vector").ok(), Some(ExportFormat::Vector));
        assert!(parse_mode("fax").is_err());
    }

    #[wasm_bindgen_test]
    fn test_parse_source() {
        assert_eq!(parse_source("drop"), InputSource::DragDrop);
        assert_eq!(parse_source("paste"), InputSource::Paste);
        assert_eq!(parse_source("picker"), InputSource::FilePicker);
    }

    #[wasm_bindgen_test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
