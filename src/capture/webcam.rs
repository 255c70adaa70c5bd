use super::{DeviceInfo, PhotoBackend, PhotoCallback, PhotoSettings, RawPhoto};
use crate::error::{SessionError, SnapError};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long `stop` waits for the camera thread before leaving it behind.
/// A thread stuck inside a driver call never reads its Stop command.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Enumerate attached video devices in platform order.
pub fn list_devices() -> Result<Vec<DeviceInfo>, SnapError> {
    let cameras =
        nokhwa::query(ApiBackend::Auto).map_err(|err| SnapError::Enumeration(err.to_string()))?;

    Ok(cameras
        .iter()
        .enumerate()
        .map(|(position, info)| {
            let index = info.index().as_index().unwrap_or(position as u32);
            DeviceInfo::new(index, info.human_name())
        })
        .collect())
}

/// Make sure the process may use the camera, asking the user if the platform
/// has not decided yet.
pub fn ensure_access() -> Result<(), SnapError> {
    if nokhwa::nokhwa_check() {
        return Ok(());
    }

    tracing::info!("Requesting camera access...");
    let (tx, rx) = mpsc::sync_channel(1);
    nokhwa::nokhwa_initialize(move |granted| {
        let _ = tx.send(granted);
    });

    match rx.recv() {
        Ok(true) => Ok(()),
        _ => Err(SnapError::PermissionDenied),
    }
}

enum Command {
    Start(SyncSender<Result<(), String>>),
    Capture(PhotoSettings, PhotoCallback),
    Stop,
}

/// nokhwa-backed camera.
///
/// The `Camera` lives on a dedicated worker thread; requests are queued to it
/// and completed through their callbacks from that thread.
#[derive(Default)]
pub struct WebcamBackend {
    commands: Option<Sender<Command>>,
    worker: Option<Worker>,
}

/// Camera thread handle plus a channel that disconnects when the thread ends.
struct Worker {
    handle: JoinHandle<()>,
    exited: Receiver<()>,
}

impl Worker {
    fn spawn(body: impl FnOnce() + Send + 'static) -> std::io::Result<Self> {
        let (exit_guard, exited) = mpsc::sync_channel::<()>(0);
        let handle = thread::Builder::new().name("camera".into()).spawn(move || {
            let _exit_guard = exit_guard;
            body();
        })?;
        Ok(Self { handle, exited })
    }

    /// Join if the thread finishes within `grace`, otherwise detach it.
    ///
    /// Returns `true` when the thread was joined.
    fn shut_down(self, grace: Duration) -> bool {
        match self.exited.recv_timeout(grace) {
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("Camera thread did not stop within {:?}; detaching it", grace);
                false
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    tracing::warn!("Camera thread panicked");
                }
                true
            }
        }
    }
}

impl WebcamBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PhotoBackend for WebcamBackend {
    fn configure(&mut self, device: &DeviceInfo) -> Result<(), SessionError> {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (command_tx, command_rx) = mpsc::channel();
        let index = device.index;

        let worker = Worker::spawn(move || run_camera(index, ready_tx, command_rx))
            .map_err(|err| SessionError::Setup(format!("could not spawn camera thread: {err}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!("Webcam {} opened", index);
                self.commands = Some(command_tx);
                self.worker = Some(worker);
                Ok(())
            }
            Ok(Err(reason)) => {
                worker.shut_down(STOP_GRACE);
                Err(SessionError::Setup(reason))
            }
            Err(_) => {
                worker.shut_down(STOP_GRACE);
                Err(SessionError::Setup("camera thread exited during setup".into()))
            }
        }
    }

    fn start(&mut self) -> Result<(), SessionError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| SessionError::Setup("camera is not configured".into()))?;

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        commands
            .send(Command::Start(reply_tx))
            .map_err(|_| SessionError::Setup("camera thread is gone".into()))?;

        match reply_rx.recv() {
            Ok(result) => result.map_err(SessionError::Setup),
            Err(_) => Err(SessionError::Setup("camera thread is gone".into())),
        }
    }

    fn stop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Stop);
        }
        if let Some(worker) = self.worker.take() {
            worker.shut_down(STOP_GRACE);
        }
    }

    fn request_photo(&mut self, settings: PhotoSettings, on_complete: PhotoCallback) {
        let Some(commands) = self.commands.as_ref() else {
            on_complete(Err("camera is not configured".into()));
            return;
        };

        let request = Command::Capture(settings, on_complete);
        if let Err(mpsc::SendError(Command::Capture(_, on_complete))) = commands.send(request) {
            on_complete(Err("camera thread is gone".into()));
        }
    }
}

impl Drop for WebcamBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_camera(index: u32, ready: SyncSender<Result<(), String>>, commands: Receiver<Command>) {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

    let mut camera = match Camera::new(CameraIndex::Index(index), requested) {
        Ok(camera) => camera,
        Err(err) => {
            let _ = ready.send(Err(format!("cannot add camera input to session: {err}")));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    for command in commands {
        match command {
            Command::Start(reply) => {
                let opened = camera
                    .open_stream()
                    .map_err(|err| format!("cannot open camera stream: {err}"));
                let _ = reply.send(opened);
            }
            Command::Capture(settings, on_complete) => on_complete(grab(&mut camera, settings)),
            Command::Stop => break,
        }
    }

    if camera.is_stream_open() {
        if let Err(err) = camera.stop_stream() {
            tracing::warn!("Failed to stop camera stream: {}", err);
        }
    }
}

fn grab(camera: &mut Camera, settings: PhotoSettings) -> Result<RawPhoto, String> {
    if settings.flash {
        tracing::debug!("Flash requested but webcams have none; ignoring");
    }

    let frame = camera.frame().map_err(|err| err.to_string())?;

    // MJPEG frames are already complete JPEG files
    if frame.source_frame_format() == FrameFormat::MJPEG {
        return Ok(RawPhoto::Encoded(frame.buffer().to_vec()));
    }

    match frame.decode_image::<RgbFormat>() {
        Ok(decoded) => {
            let (width, height) = decoded.dimensions();
            Ok(RawPhoto::Rgb {
                width,
                height,
                pixels: decoded.into_raw(),
            })
        }
        Err(err) => {
            tracing::debug!("nokhwa could not decode frame ({}); passing raw bytes", err);
            Ok(RawPhoto::Encoded(frame.buffer().to_vec()))
        }
    }
}
