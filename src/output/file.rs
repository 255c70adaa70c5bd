use super::{encode, ImageSink};
use crate::capture::CapturedImage;
use crate::error::OutputError;
use std::fs;
use std::path::Path;

/// Writes encoded photos to the local filesystem.
#[derive(Debug, Default)]
pub struct FileSink;

impl FileSink {
    pub fn new() -> Self {
        Self
    }
}

impl ImageSink for FileSink {
    fn write_image(&mut self, image: &CapturedImage, path: &Path) -> Result<(), OutputError> {
        let bytes = encode(image, path)?;

        fs::write(path, &bytes).map_err(|source| OutputError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::TempDir;

    #[test]
    fn writes_file_in_requested_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.png");
        let image = RgbImage::from_pixel(5, 4, image::Rgb([1, 2, 3]));

        FileSink::new().write_image(&image, &path).unwrap();

        let written = image::open(&path).unwrap().to_rgb8();
        assert_eq!(written, image);
    }

    #[test]
    fn missing_directory_is_a_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("snapshot.jpg");
        let image = RgbImage::new(2, 2);

        let err = FileSink::new().write_image(&image, &path).unwrap_err();
        assert!(matches!(err, OutputError::Write { .. }));
        assert_eq!(err.path(), path.as_path());
    }
}
