mod bridge;
mod device;
mod session;
mod webcam;

pub use bridge::{CaptureBridge, DEFAULT_CAPTURE_TIMEOUT};
pub use device::{select_device, DeviceInfo};
pub use session::CaptureSession;
#[cfg(test)]
pub use session::SessionState;
pub use webcam::{ensure_access, list_devices, WebcamBackend};

use crate::error::SessionError;
use image::RgbImage;

/// Decoded photo handed to the encoder
pub type CapturedImage = RgbImage;

/// Per-request photo settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhotoSettings {
    pub flash: bool,
}

/// Photo data as delivered by a backend, before decoding.
#[derive(Debug, Clone)]
pub enum RawPhoto {
    /// Encoded file data (JPEG/MJPEG, PNG, ...)
    Encoded(Vec<u8>),
    /// Packed 8-bit RGB pixels
    Rgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

/// Completion handler for one photo request: the photo, or a failure reason.
pub type PhotoCallback = Box<dyn FnOnce(Result<RawPhoto, String>) + Send + 'static>;

/// Callback-driven camera driver behind a `CaptureSession`.
///
/// Backends may complete `request_photo` on any thread, at any later time,
/// or never. `CaptureBridge` turns this into a bounded blocking call.
pub trait PhotoBackend {
    /// Attach the device to the capture pipeline
    fn configure(&mut self, device: &DeviceInfo) -> Result<(), SessionError>;

    fn start(&mut self) -> Result<(), SessionError>;

    fn stop(&mut self);

    /// Issue exactly one photo request and return without waiting.
    fn request_photo(&mut self, settings: PhotoSettings, on_complete: PhotoCallback);
}
