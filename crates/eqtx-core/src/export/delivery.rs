//! Clipboard, viewer and file sinks, and the clipboard fallback chain.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ExportError, SinkError};

use super::raster::RasterImage;

/// Writes a bitmap to an image-typed clipboard entry.
#[async_trait(?Send)]
pub trait ImageClipboard {
    async fn write_image(&self, image: &RasterImage) -> Result<(), SinkError>;
}

/// Writes plain text to the clipboard.
#[async_trait(?Send)]
pub trait TextClipboard {
    async fn write_text(&self, text: &str) -> Result<(), SinkError>;
}

/// Opens a bitmap on a new viewable surface for manual copying.
#[async_trait(?Send)]
pub trait ImageViewer {
    async fn show_image(&self, image: &RasterImage) -> Result<(), SinkError>;
}

/// Saves bytes under a file name (a browser download or a file on disk).
#[async_trait(?Send)]
pub trait FileSink {
    async fn save(&self, file_name: &str, mime_type: &str, bytes: &[u8]) -> Result<(), SinkError>;
}

/// A host capability that does not exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

#[async_trait(?Send)]
impl ImageClipboard for Unsupported {
    async fn write_image(&self, _image: &RasterImage) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("image clipboard"))
    }
}

#[async_trait(?Send)]
impl TextClipboard for Unsupported {
    async fn write_text(&self, _text: &str) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("text clipboard"))
    }
}

#[async_trait(?Send)]
impl ImageViewer for Unsupported {
    async fn show_image(&self, _image: &RasterImage) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("image viewer"))
    }
}

#[async_trait(?Send)]
impl FileSink for Unsupported {
    async fn save(&self, _file_name: &str, _mime_type: &str, _bytes: &[u8]) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("file download"))
    }
}

/// HTML page shown by viewers, with manual copy instructions.
pub fn viewer_page(image_src: &str) -> String {
    format!(
        concat!(
            "<html>\n",
            "  <body style=\"margin:0; padding:20px; text-align:center;\">\n",
            "    <h3>Generated equation image</h3>\n",
            "    <img src=\"{}\" style=\"max-width:100%; border:1px solid #ccc;\" />\n",
            "    <p>Right-click the image and choose \"Copy image\" to copy it to the clipboard.</p>\n",
            "  </body>\n",
            "</html>\n"
        ),
        image_src.replace('"', "&quot;")
    )
}

/// One step of the clipboard fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryStep {
    ImageClipboard,
    TextClipboard,
    Viewer,
    Download,
}

impl DeliveryStep {
    /// The chain, in the order it is attempted.
    pub const CHAIN: [DeliveryStep; 4] = [
        DeliveryStep::ImageClipboard,
        DeliveryStep::TextClipboard,
        DeliveryStep::Viewer,
        DeliveryStep::Download,
    ];

    /// Steps that did not reach the clipboard.
    pub fn is_degraded(&self) -> bool {
        matches!(self, DeliveryStep::Viewer | DeliveryStep::Download)
    }
}

impl fmt::Display for DeliveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStep::ImageClipboard => write!(f, "image clipboard"),
            DeliveryStep::TextClipboard => write!(f, "text clipboard"),
            DeliveryStep::Viewer => write!(f, "viewer"),
            DeliveryStep::Download => write!(f, "download"),
        }
    }
}

/// Which step succeeded and what to tell the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub step: DeliveryStep,
    pub message: String,
}

impl Delivery {
    fn new(step: DeliveryStep, raster_file_name: &str) -> Self {
        let message = match step {
            DeliveryStep::ImageClipboard => "Copied the equation image to the clipboard!".to_string(),
            DeliveryStep::TextClipboard => "Copied the SVG to the clipboard!".to_string(),
            DeliveryStep::Viewer => "The clipboard is not available. The image was opened in a new view; \
                 right-click it and choose \"Copy image\" to copy it."
                .to_string(),
            DeliveryStep::Download => format!(
                "Writing to the clipboard failed. The image was downloaded as {} instead.",
                raster_file_name
            ),
        };
        Self { step, message }
    }

    /// Degraded deliveries are reported with an alert, the rest with a
    /// transient notification.
    pub fn is_degraded(&self) -> bool {
        self.step.is_degraded()
    }
}

/// The capabilities the fallback chain may use.
#[derive(Clone, Copy)]
pub struct DeliverySinks<'a> {
    pub image_clipboard: &'a dyn ImageClipboard,
    pub text_clipboard: &'a dyn TextClipboard,
    pub viewer: &'a dyn ImageViewer,
    pub files: &'a dyn FileSink,
}

static NONE: Unsupported = Unsupported;

impl DeliverySinks<'static> {
    /// A host with no capabilities at all.
    pub fn none() -> Self {
        DeliverySinks {
            image_clipboard: &NONE,
            text_clipboard: &NONE,
            viewer: &NONE,
            files: &NONE,
        }
    }
}

/// Run the clipboard fallback chain, stopping at the first step that works.
///
/// `text_fallback` is the serialized vector document used by the text step.
pub async fn deliver_to_clipboard(
    image: &RasterImage,
    text_fallback: &str,
    raster_file_name: &str,
    sinks: DeliverySinks<'_>,
) -> Result<Delivery, ExportError> {
    let mut failures = Vec::new();

    for step in DeliveryStep::CHAIN {
        let attempt = match step {
            DeliveryStep::ImageClipboard => sinks.image_clipboard.write_image(image).await,
            DeliveryStep::TextClipboard => sinks.text_clipboard.write_text(text_fallback).await,
            DeliveryStep::Viewer => sinks.viewer.show_image(image).await,
            DeliveryStep::Download => {
                sinks
                    .files
                    .save(raster_file_name, "image/png", &image.png)
                    .await
            }
        };

        match attempt {
            Ok(()) => {
                info!("Delivered {}x{} image via {}", image.width, image.height, step);
                return Ok(Delivery::new(step, raster_file_name));
            }
            Err(e @ SinkError::Unavailable(_)) => {
                debug!("Skipping {}: {}", step, e);
                failures.push(format!("{}: {}", step, e));
            }
            Err(e) => {
                warn!("{} failed: {}", step, e);
                failures.push(format!("{}: {}", step, e));
            }
        }
    }

    Err(ExportError::DeliveryExhausted(failures.join("; ")))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Records every write; fails according to its configuration.
    #[derive(Default)]
    pub struct RecordingSink {
        pub fail_with: Option<SinkError>,
        pub images: RefCell<Vec<(u32, u32)>>,
        pub texts: RefCell<Vec<String>>,
        pub files: RefCell<Vec<(String, String, Vec<u8>)>>,
    }

    impl RecordingSink {
        pub fn failing(error: SinkError) -> Self {
            Self {
                fail_with: Some(error),
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), SinkError> {
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        pub fn calls(&self) -> usize {
            self.images.borrow().len() + self.texts.borrow().len() + self.files.borrow().len()
        }
    }

    #[async_trait(?Send)]
    impl ImageClipboard for RecordingSink {
        async fn write_image(&self, image: &RasterImage) -> Result<(), SinkError> {
            self.check()?;
            self.images.borrow_mut().push((image.width, image.height));
            Ok(())
        }
    }

    #[async_trait(?Send)]
    impl TextClipboard for RecordingSink {
        async fn write_text(&self, text: &str) -> Result<(), SinkError> {
            self.check()?;
            self.texts.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    #[async_trait(?Send)]
    impl ImageViewer for RecordingSink {
        async fn show_image(&self, image: &RasterImage) -> Result<(), SinkError> {
            self.check()?;
            self.images.borrow_mut().push((image.width, image.height));
            Ok(())
        }
    }

    #[async_trait(?Send)]
    impl FileSink for RecordingSink {
        async fn save(&self, file_name: &str, mime_type: &str, bytes: &[u8]) -> Result<(), SinkError> {
            self.check()?;
            self.files
                .borrow_mut()
                .push((file_name.to_string(), mime_type.to_string(), bytes.to_vec()));
            Ok(())
        }
    }
}
