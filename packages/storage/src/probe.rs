//! Image sniffing on the first bytes of an upload.
//!
//! Only headers are decoded; pixel data is never touched.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use super::error::StorageError;

/// Format and pixel dimensions read from an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn format_tag(&self) -> &'static str {
        format_tag(self.format)
    }
}

/// Short tag for a format, matching what hosted image providers report.
pub fn format_tag(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        other => other.extensions_str().first().copied().unwrap_or("bin"),
    }
}

/// Guess the image format from magic bytes.
pub fn sniff(head: &[u8]) -> Option<ImageFormat> {
    image::guess_format(head).ok()
}

/// Image format named by a media type such as `image/png`.
pub fn format_for_media_type(media_type: &str) -> Option<ImageFormat> {
    ImageFormat::from_mime_type(media_type)
}

/// Read format and dimensions from the head of an image.
pub fn inspect(head: &[u8]) -> Result<ImageInfo, StorageError> {
    let format = sniff(head)
        .ok_or_else(|| StorageError::Malformed("unrecognized image signature".into()))?;
    let (width, height) = ImageReader::with_format(Cursor::new(head), format)
        .into_dimensions()
        .map_err(|e| StorageError::Malformed(format!("unreadable {format:?} header: {e}")))?;

    Ok(ImageInfo {
        format,
        width,
        height,
    })
}
