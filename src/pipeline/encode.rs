//! Image encoding: page file on disk → base64 payload with a MIME type.
//!
//! The bytes are sent exactly as stage 1 (or the operator) wrote them; no
//! re-encoding, resizing or compression happens here.

use crate::error::Pdf2RagError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// MIME type used when the extension is not recognised.
pub const FALLBACK_MIME: &str = "image/png";

/// A page image ready to embed in a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub mime_type: String,
    /// Standard base64, no line breaks.
    pub data: String,
}

impl PageImage {
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Convert into the edgequake-llm attachment type.
    pub fn to_image_data(&self) -> edgequake_llm::ImageData {
        edgequake_llm::ImageData::new(self.data.clone(), self.mime_type.clone())
    }
}

/// Guess an image MIME type from the file extension, defaulting to PNG.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => FALLBACK_MIME,
    }
}

/// Read a page image from disk and base64-encode it.
pub async fn load_page_image(path: &Path) -> Result<PageImage, Pdf2RagError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Pdf2RagError::ImageReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    let image = PageImage::from_bytes(&bytes, guess_mime(path));
    debug!(
        "Encoded {} ({} bytes) → {} bytes base64",
        path.display(),
        bytes.len(),
        image.data.len()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_layout() {
        let img = PageImage::from_bytes(b"\x89PNG", "image/png");
        assert_eq!(img.data_uri(), "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn mime_by_extension() {
        assert_eq!(guess_mime(Path::new("1.png")), "image/png");
        assert_eq!(guess_mime(Path::new("1.JPG")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("1.jpeg")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("1.webp")), "image/webp");
    }

    #[test]
    fn unknown_extension_falls_back_to_png() {
        assert_eq!(guess_mime(Path::new("scan.xyz")), "image/png");
        assert_eq!(guess_mime(Path::new("no_extension")), "image/png");
    }

    #[test]
    fn image_data_keeps_payload_and_mime() {
        let img = PageImage::from_bytes(b"abc", "image/webp");
        let data = img.to_image_data();
        assert_eq!(data.mime_type, "image/webp");
        assert_eq!(data.data, STANDARD.encode(b"abc"));
    }

    #[tokio::test]
    async fn load_reads_and_encodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("3.weird");
        std::fs::write(&path, b"hello").unwrap();
        let img = load_page_image(&path).await.unwrap();
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&img.data).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn load_missing_file_is_read_error() {
        let err = load_page_image(Path::new("/no/such/page.png")).await.unwrap_err();
        assert!(matches!(err, Pdf2RagError::ImageReadFailed { .. }));
    }
}
