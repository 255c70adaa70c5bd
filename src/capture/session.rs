use super::{DeviceInfo, PhotoBackend, PhotoCallback, PhotoSettings};
use crate::error::{CaptureError, SessionError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Configured,
    Running,
    Stopped,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Unconfigured => "unconfigured",
            SessionState::Configured => "configured",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        }
    }
}

/// Live binding between one device and this process.
///
/// Moves strictly forward through `Unconfigured -> Configured -> Running ->
/// Stopped`. A stopped session (including one whose setup failed) cannot be
/// restarted; build a new one instead.
pub struct CaptureSession<B> {
    backend: B,
    state: SessionState,
    device: Option<DeviceInfo>,
}

impl<B: PhotoBackend> CaptureSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: SessionState::Unconfigured,
            device: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn device_name(&self) -> &str {
        self.device.as_ref().map_or("Unknown", |d| d.name.as_str())
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn setup(&mut self, device: &DeviceInfo) -> Result<(), SessionError> {
        self.expect_state(SessionState::Unconfigured, "set up")?;
        tracing::info!("Setting up capture session for device: {}", device.name);

        self.device = Some(device.clone());
        match self.backend.configure(device) {
            Ok(()) => {
                self.state = SessionState::Configured;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Stopped;
                Err(err)
            }
        }
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Configured, "start")?;
        tracing::info!("Starting capture session...");

        match self.backend.start() {
            Ok(()) => {
                self.state = SessionState::Running;
                Ok(())
            }
            Err(err) => {
                self.backend.stop();
                self.state = SessionState::Stopped;
                Err(err)
            }
        }
    }

    /// Release the device. Safe to call more than once.
    pub fn stop(&mut self) {
        match self.state {
            SessionState::Stopped => {}
            SessionState::Unconfigured => self.state = SessionState::Stopped,
            SessionState::Configured | SessionState::Running => {
                tracing::info!("Stopping capture session...");
                self.backend.stop();
                self.state = SessionState::Stopped;
            }
        }
    }

    pub(super) fn request_photo(
        &mut self,
        settings: PhotoSettings,
        on_complete: PhotoCallback,
    ) -> Result<(), CaptureError> {
        if self.state != SessionState::Running {
            return Err(CaptureError::NotRunning);
        }
        self.backend.request_photo(settings, on_complete);
        Ok(())
    }

    fn expect_state(
        &self,
        expected: SessionState,
        action: &'static str,
    ) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                state: self.state.name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RawPhoto;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_configure: bool,
        fail_start: bool,
    }

    impl PhotoBackend for Recorder {
        fn configure(&mut self, _device: &DeviceInfo) -> Result<(), SessionError> {
            self.calls.push("configure");
            if self.fail_configure {
                return Err(SessionError::Setup("cannot add camera input".into()));
            }
            Ok(())
        }

        fn start(&mut self) -> Result<(), SessionError> {
            self.calls.push("start");
            if self.fail_start {
                return Err(SessionError::Setup("stream refused".into()));
            }
            Ok(())
        }

        fn stop(&mut self) {
            self.calls.push("stop");
        }

        fn request_photo(&mut self, _settings: PhotoSettings, on_complete: PhotoCallback) {
            self.calls.push("request");
            on_complete(Ok(RawPhoto::Encoded(Vec::new())));
        }
    }

    fn device() -> DeviceInfo {
        DeviceInfo::new(0, "Test Cam")
    }

    #[test]
    fn walks_through_lifecycle() {
        let mut session = CaptureSession::new(Recorder::default());
        assert_eq!(session.state(), SessionState::Unconfigured);
        assert_eq!(session.device_name(), "Unknown");

        session.setup(&device()).unwrap();
        assert_eq!(session.state(), SessionState::Configured);
        assert_eq!(session.device_name(), "Test Cam");

        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Running);

        session.stop();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.backend().calls, vec!["configure", "start", "stop"]);
    }

    #[test]
    fn stopped_session_cannot_restart() {
        let mut session = CaptureSession::new(Recorder::default());
        session.setup(&device()).unwrap();
        session.start().unwrap();
        session.stop();

        assert!(matches!(
            session.start(),
            Err(SessionError::InvalidTransition { state: "stopped", .. })
        ));
        assert!(session.setup(&device()).is_err());
    }

    #[test]
    fn failed_setup_leaves_session_stopped() {
        let backend = Recorder {
            fail_configure: true,
            ..Default::default()
        };
        let mut session = CaptureSession::new(backend);

        assert!(matches!(session.setup(&device()), Err(SessionError::Setup(_))));
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.start().is_err());
    }

    #[test]
    fn failed_start_releases_backend() {
        let backend = Recorder {
            fail_start: true,
            ..Default::default()
        };
        let mut session = CaptureSession::new(backend);
        session.setup(&device()).unwrap();

        assert!(session.start().is_err());
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.backend().calls, vec!["configure", "start", "stop"]);
    }

    #[test]
    fn requests_require_running_session() {
        let mut session = CaptureSession::new(Recorder::default());
        session.setup(&device()).unwrap();

        let result = session.request_photo(PhotoSettings::default(), Box::new(|_| {}));
        assert!(matches!(result, Err(CaptureError::NotRunning)));
        assert_eq!(session.backend().calls, vec!["configure"]);
    }
}
