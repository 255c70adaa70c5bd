use super::{CaptureSession, CapturedImage, PhotoBackend, PhotoSettings, RawPhoto};
use crate::error::CaptureError;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns a backend's callback-driven photo request into a blocking call with
/// an upper bound.
///
/// At most one request is outstanding at a time. Each request gets a fresh
/// result channel, so a completion that arrives after its caller timed out is
/// dropped instead of being returned to a later call.
#[derive(Default)]
pub struct CaptureBridge {
    in_flight: Arc<AtomicBool>,
}

impl CaptureBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a request (possibly a timed-out one) has not completed
    #[cfg(test)]
    pub fn is_outstanding(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn capture_photo<B: PhotoBackend>(
        &mut self,
        session: &mut CaptureSession<B>,
        timeout: Duration,
    ) -> Result<CapturedImage, CaptureError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::Busy);
        }

        let (tx, rx) = mpsc::sync_channel(1);
        let in_flight = Arc::clone(&self.in_flight);
        let settings = PhotoSettings { flash: false };

        let requested = session.request_photo(
            settings,
            Box::new(move |result| {
                in_flight.store(false, Ordering::Release);
                let _ = tx.send(result);
            }),
        );
        if let Err(err) = requested {
            self.in_flight.store(false, Ordering::Release);
            return Err(err);
        }

        match rx.recv_timeout(timeout) {
            Ok(Ok(raw)) => decode(raw),
            Ok(Err(reason)) => Err(CaptureError::DeviceFailure(reason)),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("No capture completion within {:?}", timeout);
                Err(CaptureError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.in_flight.store(false, Ordering::Release);
                Err(CaptureError::DeviceFailure(
                    "capture request dropped without completing".into(),
                ))
            }
        }
    }
}

fn decode(raw: RawPhoto) -> Result<CapturedImage, CaptureError> {
    match raw {
        RawPhoto::Encoded(bytes) => {
            if bytes.is_empty() {
                return Err(CaptureError::DecodeFailure("empty image data".into()));
            }
            image::load_from_memory(&bytes)
                .map(|img| img.to_rgb8())
                .map_err(|err| CaptureError::DecodeFailure(err.to_string()))
        }
        RawPhoto::Rgb {
            width,
            height,
            pixels,
        } => {
            if pixels.is_empty() {
                return Err(CaptureError::DecodeFailure("empty image data".into()));
            }
            let len = pixels.len();
            RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
                CaptureError::DecodeFailure(format!(
                    "{len} bytes do not fill a {width}x{height} RGB frame"
                ))
            })
        }
    }
}
