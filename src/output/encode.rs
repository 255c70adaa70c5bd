use crate::capture::CapturedImage;
use crate::error::OutputError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Fixed JPEG quality (0-100)
pub const JPEG_QUALITY: u8 = 90;

/// Output encoding, chosen from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Tiff,
    Bmp,
    Gif,
}

impl ImageKind {
    /// Unknown or missing extensions fall back to JPEG.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "png" => ImageKind::Png,
            "tif" | "tiff" => ImageKind::Tiff,
            "bmp" => ImageKind::Bmp,
            "gif" => ImageKind::Gif,
            _ => ImageKind::Jpeg,
        }
    }
}

/// Encode a captured photo into the file format `path` asks for.
pub fn encode(image: &CapturedImage, path: &Path) -> Result<Vec<u8>, OutputError> {
    let kind = ImageKind::from_path(path);
    let _span = tracing::debug_span!("encode", ?kind).entered();

    let mut bytes = Vec::new();
    let result = match kind {
        ImageKind::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
            DynamicImage::ImageRgb8(image.clone()).write_with_encoder(encoder)
        }
        ImageKind::Png => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png),
        ImageKind::Tiff => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Tiff),
        ImageKind::Bmp => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Bmp),
        ImageKind::Gif => {
            let rgba = DynamicImage::ImageRgb8(image.clone()).to_rgba8();
            rgba.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Gif)
        }
    };

    result.map_err(|source| OutputError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes)
}
