use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by a single photo request.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture timed out after {:.1}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("device failure: {0}")]
    DeviceFailure(String),

    #[error("could not decode captured image: {0}")]
    DecodeFailure(String),

    /// A previous request has not completed yet
    #[error("a capture request is already outstanding")]
    Busy,

    #[error("capture session is not running")]
    NotRunning,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Setup(String),

    #[error("cannot {action} a session that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("could not encode image: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            OutputError::Encode { path, .. } | OutputError::Write { path, .. } => path,
        }
    }
}

/// Every fatal condition the tool can end a run with.
#[derive(Debug, Error)]
pub enum SnapError {
    #[error("Camera access denied. Grant camera permission to this terminal and try again.")]
    PermissionDenied,

    #[error("{}", no_device_message(.0))]
    NoDeviceFound(Option<String>),

    #[error("Failed to enumerate video devices: {0}")]
    Enumeration(String),

    #[error("Failed to set up capture session: {0}")]
    SessionSetup(#[from] SessionError),

    #[error("Failed to capture photo: {0}")]
    Capture(#[from] CaptureError),

    #[error("Failed to save image to {}: {}", .0.path().display(), .0)]
    Output(#[from] OutputError),

    /// Every frame index for this series name is already taken
    #[error("No frame numbers left for series {}", .0.display())]
    SequenceExhausted(PathBuf),
}

fn no_device_message(hint: &Option<String>) -> String {
    match hint {
        Some(name) => format!("No video device found matching \"{name}\""),
        None => "No video devices available.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_device_message_mentions_the_hint() {
        let err = SnapError::NoDeviceFound(Some("FaceTime".into()));
        assert_eq!(err.to_string(), "No video device found matching \"FaceTime\"");

        let err = SnapError::NoDeviceFound(None);
        assert_eq!(err.to_string(), "No video devices available.");
    }

    #[test]
    fn output_error_names_the_path() {
        let err = SnapError::from(OutputError::Write {
            path: PathBuf::from("/nope/shot.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        });
        assert!(err.to_string().starts_with("Failed to save image to /nope/shot.png"));
    }

    #[test]
    fn exhausted_series_names_the_base() {
        let err = SnapError::SequenceExhausted(PathBuf::from("shots/lapse.jpg"));
        assert_eq!(err.to_string(), "No frame numbers left for series shots/lapse.jpg");
    }
}
