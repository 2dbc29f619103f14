// src/invoice/attachment.rs
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageFormat};
use log::info;
use std::path::Path;

/// File extensions accepted by the attach dialog and the CLI.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

//Image kinds the service accepts, detected from magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// MIME type declared to the service for this kind.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }

    //Sniff the format from the file signature, never from the extension
    fn sniff(bytes: &[u8]) -> Result<Self> {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Png) => Ok(ImageKind::Png),
            Ok(ImageFormat::Jpeg) => Ok(ImageKind::Jpeg),
            Ok(other) => Err(anyhow!(
                "Unsupported image format {:?}, choose a JPEG or PNG file",
                other
            )),
            Err(_) => Err(anyhow!("File does not look like a JPEG or PNG image")),
        }
    }
}

/// An attached invoice scan. Holds the file's bytes exactly as read;
/// the service receives them unchanged.
#[derive(Debug, Clone)]
pub struct InvoiceImage {
    bytes: Vec<u8>,
    kind: ImageKind,
}

impl InvoiceImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(anyhow!("Image file is empty"));
        }
        let kind = ImageKind::sniff(&bytes)?;
        Ok(Self { bytes, kind })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let image = Self::from_bytes(bytes)
            .with_context(|| format!("Failed to attach {}", path.display()))?;
        info!(
            "Attached {} ({} bytes, {})",
            path.display(),
            image.len(),
            image.mime_type()
        );
        Ok(image)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    /// Decode a bitmap for the on-screen preview. The raw bytes stay untouched.
    pub fn decode_preview(&self) -> Result<DynamicImage> {
        image::load_from_memory(&self.bytes).context("Failed to decode image for preview")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_png_bytes_sniffed_as_png() {
        let image = InvoiceImage::from_bytes(PNG_SIGNATURE.to_vec()).unwrap();
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn test_jpeg_bytes_sniffed_as_jpeg() {
        let image = InvoiceImage::from_bytes(JPEG_SIGNATURE.to_vec()).unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_bytes_kept_verbatim() {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[1, 2, 3, 4, 5]);
        let image = InvoiceImage::from_bytes(bytes.clone()).unwrap();
        assert_eq!(image.bytes(), bytes.as_slice());
        assert_eq!(image.len(), bytes.len());
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let err = InvoiceImage::from_bytes(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_unrecognized_bytes_rejected() {
        let err = InvoiceImage::from_bytes(b"definitely not an image".to_vec()).unwrap_err();
        assert!(err.to_string().contains("JPEG or PNG"));
    }

    #[test]
    fn test_other_image_formats_rejected() {
        // GIF signature: recognized by the sniffer, but not accepted
        let err = InvoiceImage::from_bytes(b"GIF89a\x01\x00\x01\x00".to_vec()).unwrap_err();
        assert!(err.to_string().contains("Unsupported image format"));
    }

    #[test]
    fn test_from_path_reads_file_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PNG_SIGNATURE).unwrap();
        file.flush().unwrap();

        let image = InvoiceImage::from_path(file.path()).unwrap();
        assert_eq!(image.bytes(), PNG_SIGNATURE);
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = InvoiceImage::from_path(Path::new("/no/such/invoice.png")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_extension_is_not_trusted() {
        // A text file renamed to .png is still rejected
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"just some text").unwrap();

        let err = InvoiceImage::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to attach"));
    }
}
