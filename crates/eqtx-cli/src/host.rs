//! Native host capabilities: system clipboard, viewer page and output directory.

use std::borrow::Cow;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;

use arboard::{Clipboard, ImageData};
use async_trait::async_trait;
use clap::Args;
use console::style;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::{debug, info};

use eqtx_core::export::{RasterImage, viewer_page};
use eqtx_core::{FileSink, ImageClipboard, ImageViewer, InputItem, SinkError, TextClipboard};

/// The system clipboard through `arboard`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    fn open() -> Result<Clipboard, SinkError> {
        Clipboard::new().map_err(|e| {
            debug!("Clipboard unavailable: {}", e);
            SinkError::Unavailable("system clipboard")
        })
    }

    /// Read an image from the clipboard as a PNG input item.
    pub fn read_image() -> anyhow::Result<Option<InputItem>> {
        let mut clipboard = Clipboard::new()?;
        let data = match clipboard.get_image() {
            Ok(data) => data,
            Err(arboard::Error::ContentNotAvailable) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let pixels = RgbaImage::from_raw(data.width as u32, data.height as u32, data.bytes.into_owned())
            .ok_or_else(|| anyhow::anyhow!("Clipboard image has an unexpected size"))?;
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(pixels).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        Ok(Some(InputItem {
            name: None,
            mime_type: Some("image/png".to_string()),
            bytes: png,
            preview: None,
        }))
    }
}

#[async_trait(?Send)]
impl ImageClipboard for SystemClipboard {
    async fn write_image(&self, image: &RasterImage) -> Result<(), SinkError> {
        persist(ClipboardPayload::Image {
            width: image.width as usize,
            height: image.height as usize,
            bytes: image.pixels.clone(),
        })
    }
}

#[async_trait(?Send)]
impl TextClipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), SinkError> {
        persist(ClipboardPayload::Text(text.to_string()))
    }
}

/// Name of the hidden subcommand that owns clipboard contents on Linux.
pub const SERVE_CLIPBOARD: &str = "serve-clipboard";

/// Arguments of the hidden clipboard-owning subcommand. The payload is read
/// from stdin: UTF-8 text, or RGBA pixels when a size is given.
#[derive(Args, Debug, Default)]
pub struct ServeClipboardArgs {
    /// Image width in pixels
    #[arg(long, requires = "height")]
    width: Option<usize>,

    /// Image height in pixels
    #[arg(long, requires = "width")]
    height: Option<usize>,
}

/// Contents placed on the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardPayload {
    Text(String),
    Image {
        width: usize,
        height: usize,
        bytes: Vec<u8>,
    },
}

impl ClipboardPayload {
    /// Rebuild a payload handed over on stdin.
    pub fn from_parts(args: &ServeClipboardArgs, input: Vec<u8>) -> anyhow::Result<Self> {
        match (args.width, args.height) {
            (Some(width), Some(height)) => {
                if input.len() != width * height * 4 {
                    anyhow::bail!(
                        "Pixel data ({} bytes) does not match a {}x{} image",
                        input.len(),
                        width,
                        height
                    );
                }
                Ok(Self::Image {
                    width,
                    height,
                    bytes: input,
                })
            }
            _ => Ok(Self::Text(String::from_utf8(input)?)),
        }
    }

    /// Arguments describing this payload to the helper process.
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Image { width, height, .. } => vec![
                "--width".to_string(),
                width.to_string(),
                "--height".to_string(),
                height.to_string(),
            ],
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Image { bytes, .. } => bytes,
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn write_to(&self, clipboard: &mut Clipboard) -> Result<(), arboard::Error> {
        match self {
            Self::Text(text) => clipboard.set_text(text.as_str()),
            Self::Image {
                width,
                height,
                bytes,
            } => clipboard.set_image(ImageData {
                width: *width,
                height: *height,
                bytes: Cow::Borrowed(bytes),
            }),
        }
    }

    /// Write and keep serving the contents until another program replaces them.
    #[cfg(target_os = "linux")]
    fn write_and_wait(&self, clipboard: &mut Clipboard) -> Result<(), arboard::Error> {
        use arboard::SetExtLinux;

        match self {
            Self::Text(text) => clipboard.set().wait().text(text.as_str()),
            Self::Image {
                width,
                height,
                bytes,
            } => clipboard.set().wait().image(ImageData {
                width: *width,
                height: *height,
                bytes: Cow::Borrowed(bytes),
            }),
        }
    }
}

fn write_failed(e: impl std::fmt::Display) -> SinkError {
    SinkError::WriteFailed(e.to_string())
}

/// Place `payload` on the clipboard.
#[cfg(not(target_os = "linux"))]
fn persist(payload: ClipboardPayload) -> Result<(), SinkError> {
    let mut clipboard = SystemClipboard::open()?;
    payload.write_to(&mut clipboard).map_err(write_failed)
}

/// Place `payload` on the clipboard.
///
/// X11 and Wayland selections die with the owning process, so a detached
/// copy of this binary takes ownership and serves the contents.
#[cfg(target_os = "linux")]
fn persist(payload: ClipboardPayload) -> Result<(), SinkError> {
    use std::process::{Command, Stdio};

    drop(SystemClipboard::open()?);

    let exe = std::env::current_exe().map_err(write_failed)?;
    let mut child = Command::new(exe)
        .arg(SERVE_CLIPBOARD)
        .args(payload.args())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(write_failed)?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| SinkError::WriteFailed("clipboard helper has no stdin".to_string()))?;
    stdin.write_all(payload.bytes()).map_err(write_failed)?;
    drop(stdin);

    debug!("Clipboard contents handed to process {}", child.id());
    Ok(())
}

/// Run the hidden clipboard-owning subcommand.
pub fn serve_clipboard(args: ServeClipboardArgs) -> anyhow::Result<()> {
    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;
    let payload = ClipboardPayload::from_parts(&args, input)?;

    let mut clipboard = Clipboard::new()?;
    #[cfg(target_os = "linux")]
    payload.write_and_wait(&mut clipboard)?;
    #[cfg(not(target_os = "linux"))]
    payload.write_to(&mut clipboard)?;
    Ok(())
}

/// Writes the bitmap and a viewer page to temporary files and points the
/// user at them. Only available when someone is at the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TempFileViewer;

#[async_trait(?Send)]
impl ImageViewer for TempFileViewer {
    async fn show_image(&self, image: &RasterImage) -> Result<(), SinkError> {
        if !console::user_attended() {
            return Err(SinkError::Unavailable("image viewer"));
        }

        let image_path = keep_temp(".png", &image.png)?;
        let page = viewer_page(&format!("file://{}", image_path.display()));
        let page_path = keep_temp(".html", page.as_bytes())?;

        eprintln!(
            "{} Open {} in a browser to copy the image.",
            style("ℹ").blue(),
            page_path.display()
        );
        Ok(())
    }
}

fn keep_temp(suffix: &str, bytes: &[u8]) -> Result<PathBuf, SinkError> {
    let mut file = tempfile::Builder::new()
        .prefix("eqtx-")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| SinkError::WriteFailed(e.to_string()))?;
    file.write_all(bytes)
        .map_err(|e| SinkError::WriteFailed(e.to_string()))?;
    let (_, path) = file
        .keep()
        .map_err(|e| SinkError::WriteFailed(e.to_string()))?;
    Ok(path)
}

/// Saves downloads into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait(?Send)]
impl FileSink for DirectorySink {
    async fn save(&self, file_name: &str, mime_type: &str, bytes: &[u8]) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir).map_err(|e| SinkError::WriteFailed(e.to_string()))?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes).map_err(|e| SinkError::WriteFailed(e.to_string()))?;

        info!("Saved {} ({}, {} bytes)", path.display(), mime_type, bytes.len());
        println!("{} Saved {}", style("✓").green(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Serve {
        #[command(flatten)]
        args: ServeClipboardArgs,
    }

    fn reparse(payload: &ClipboardPayload) -> ClipboardPayload {
        let argv = std::iter::once(SERVE_CLIPBOARD.to_string()).chain(payload.args());
        let serve = Serve::try_parse_from(argv).unwrap();
        ClipboardPayload::from_parts(&serve.args, payload.bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_clipboard_payload_survives_handoff() {
        let text = ClipboardPayload::Text("$$ \n x^2 \n $$".to_string());
        assert_eq!(reparse(&text), text);

        let image = ClipboardPayload::Image {
            width: 2,
            height: 1,
            bytes: vec![0, 0, 0, 255, 255, 255, 255, 0],
        };
        assert_eq!(reparse(&image), image);
    }

    #[test]
    fn test_clipboard_payload_rejects_short_pixels() {
        let args = ServeClipboardArgs {
            width: Some(2),
            height: Some(2),
        };
        let err = ClipboardPayload::from_parts(&args, vec![0; 3]).unwrap_err();
        assert!(err.to_string().contains("does not match a 2x2 image"));
    }

    #[tokio::test]
    async fn test_directory_sink_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));

        sink.save("formula.svg", "image/svg+xml;charset=utf-8", b"<svg/>")
            .await
            .unwrap();

        let written = fs::read(dir.path().join("out").join("formula.svg")).unwrap();
        assert_eq!(written, b"<svg/>");
    }
}
