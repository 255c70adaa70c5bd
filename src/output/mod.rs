mod encode;
mod file;

pub use encode::encode;
pub use file::FileSink;

use crate::capture::CapturedImage;
use crate::error::OutputError;
use std::path::Path;

/// Trait for photo destinations
pub trait ImageSink {
    /// Encode `image` for `path` and persist it there
    fn write_image(&mut self, image: &CapturedImage, path: &Path) -> Result<(), OutputError>;
}
