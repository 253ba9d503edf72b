//! Image acquisition from the file picker, drag-and-drop and paste.
//!
//! All three entry points produce the same [`ImageInput`]: the raw bytes,
//! their MIME type and a reference the host can use to show a preview.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Where an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSource {
    FilePicker,
    DragDrop,
    Paste,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::FilePicker => write!(f, "file picker"),
            InputSource::DragDrop => write!(f, "drag and drop"),
            InputSource::Paste => write!(f, "paste"),
        }
    }
}

/// A locally resolvable preview of the acquired image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewRef {
    /// A file on disk.
    Path(PathBuf),
    /// A URL owned by the host (for example a browser object URL).
    Url(String),
    /// No external handle; the preview is derived from the bytes.
    Inline,
}

/// One candidate item offered by an entry point.
#[derive(Debug, Clone)]
pub struct InputItem {
    /// File name, if the host reports one.
    pub name: Option<String>,
    /// MIME type reported by the host.
    pub mime_type: Option<String>,
    /// Raw contents.
    pub bytes: Vec<u8>,
    /// Preview handle, if the host already created one.
    pub preview: Option<PreviewRef>,
}

impl InputItem {
    /// Create an item from bytes with no reported metadata.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            name: None,
            mime_type: None,
            bytes,
            preview: None,
        }
    }

    /// The reported MIME type, or one sniffed from the contents.
    pub fn resolved_mime(&self) -> Option<String> {
        match self.mime_type.as_deref() {
            Some(mime) if !mime.is_empty() => Some(mime.to_string()),
            _ => image::guess_format(&self.bytes)
                .ok()
                .map(|format| format.to_mime_type().to_string()),
        }
    }

    /// Whether the item reports (or sniffs as) an image type.
    pub fn is_image(&self) -> bool {
        self.resolved_mime()
            .map(|mime| mime.starts_with("image/"))
            .unwrap_or(false)
    }
}

/// A decodable image plus its preview reference.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub name: Option<String>,
    pub preview: PreviewRef,
    pub source: InputSource,
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("name", &self.name)
            .field("preview", &self.preview)
            .field("source", &self.source)
            .finish()
    }
}

impl ImageInput {
    /// Read an image chosen through a file picker (or named on the command line).
    ///
    /// Returns `Ok(None)` when the file does not look like an image.
    pub fn from_path(path: &Path) -> Result<Option<Self>> {
        let bytes = std::fs::read(path)?;
        let mime_type = ImageFormat::from_path(path)
            .ok()
            .map(|format| format.to_mime_type().to_string());

        let item = InputItem {
            name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            mime_type,
            bytes,
            preview: Some(PreviewRef::Path(path.to_path_buf())),
        };

        Ok(select_image(vec![item], InputSource::FilePicker))
    }

    /// Base64 encoding of the raw bytes.
    pub fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Decode the bytes.
    pub fn decode(&self) -> Result<DynamicImage> {
        Ok(image::load_from_memory(&self.bytes)?)
    }
}

/// Pick the first item that reports an image type; the rest are ignored.
pub fn select_image(items: Vec<InputItem>, source: InputSource) -> Option<ImageInput> {
    let total = items.len();
    let chosen = items.into_iter().enumerate().find_map(|(index, item)| {
        let mime = item.resolved_mime()?;
        if !mime.starts_with("image/") {
            debug!("Skipping non-image item {} ({})", index, mime);
            return None;
        }
        Some((index, item, mime))
    });

    let (index, item, mime_type) = chosen?;
    debug!(
        "Selected item {} of {} from {} as {}",
        index + 1,
        total,
        source,
        mime_type
    );

    Some(ImageInput {
        bytes: item.bytes,
        mime_type,
        name: item.name,
        preview: item.preview.unwrap_or(PreviewRef::Inline),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_first_image_item_wins() {
        let items = vec![
            InputItem {
                name: Some("notes.txt".to_string()),
                mime_type: Some("text/plain".to_string()),
                bytes: b"hello".to_vec(),
                preview: None,
            },
            InputItem {
                name: Some("a.jpg".to_string()),
                mime_type: Some("image/jpeg".to_string()),
                bytes: vec![1, 2, 3],
                preview: Some(PreviewRef::Url("blob:a".to_string())),
            },
            InputItem {
                name: Some("b.png".to_string()),
                mime_type: Some("image/png".to_string()),
                bytes: vec![4, 5, 6],
                preview: None,
            },
        ];

        let image = select_image(items, InputSource::DragDrop).unwrap();
        assert_eq!(image.name.as_deref(), Some("a.jpg"));
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.preview, PreviewRef::Url("blob:a".to_string()));
        assert_eq!(image.source, InputSource::DragDrop);
    }

    #[test]
    fn test_missing_mime_is_sniffed() {
        let item = InputItem::from_bytes(PNG_MAGIC.to_vec());
        assert_eq!(item.resolved_mime().as_deref(), Some("image/png"));

        let image = select_image(vec![item], InputSource::Paste).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.preview, PreviewRef::Inline);
    }

    #[test]
    fn test_no_image_items() {
        let items = vec![InputItem::from_bytes(b"plain text".to_vec())];
        assert!(select_image(items, InputSource::Paste).is_none());
        assert!(select_image(Vec::new(), InputSource::DragDrop).is_none());
    }

    #[test]
    fn test_base64_encoding() {
        let image = select_image(
            vec![InputItem {
                name: None,
                mime_type: Some("image/png".to_string()),
                bytes: b"abc".to_vec(),
                preview: None,
            }],
            InputSource::FilePicker,
        )
        .unwrap();
        assert_eq!(image.base64(), "YWJj");
    }
}
