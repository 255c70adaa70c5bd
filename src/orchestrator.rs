//! Drives one run: bind the device, warm up, then take a single photo or a
//! timelapse series until the count limit, a failure, or an interrupt.

use crate::cancel::CancelToken;
use crate::capture::{CaptureBridge, CaptureSession, DeviceInfo, PhotoBackend};
use crate::console::Console;
use crate::error::SnapError;
use crate::output::ImageSink;
use crate::sequence::Sequence;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cadence of the warm-up progress dots
const WARMUP_TICK: Duration = Duration::from_millis(100);

/// Repeated capture settings, fixed for the whole run.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelapsePlan {
    pub interval: Duration,
    /// `None` runs until interrupted
    pub max_captures: Option<u64>,
    pub base: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mode {
    Single { path: PathBuf },
    Timelapse(TimelapsePlan),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub warmup: Duration,
    pub capture_timeout: Duration,
    pub mode: Mode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Init,
    DeviceBound,
    WarmingUp,
    /// Working on the n-th capture of this run
    Capturing(u64),
    Done,
    Failed,
    Interrupted,
}

/// How a run ended when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Interrupted,
}

/// Blocking delays, cut short by cancellation.
pub trait Pacer {
    /// Wait for `duration`; returns `true` if the wait ended because of `cancel`.
    fn pause(&mut self, duration: Duration, cancel: &CancelToken) -> bool;
}

/// Real time.
#[derive(Debug, Default)]
pub struct WallClock;

impl Pacer for WallClock {
    fn pause(&mut self, duration: Duration, cancel: &CancelToken) -> bool {
        cancel.wait(duration)
    }
}

pub struct Orchestrator<B, S, P> {
    session: CaptureSession<B>,
    bridge: CaptureBridge,
    sink: S,
    pacer: P,
    console: Console,
    cancel: CancelToken,
    state: RunState,
}

impl<B, S, P> Orchestrator<B, S, P>
where
    B: PhotoBackend,
    S: ImageSink,
    P: Pacer,
{
    pub fn new(
        session: CaptureSession<B>,
        sink: S,
        pacer: P,
        console: Console,
        cancel: CancelToken,
    ) -> Self {
        Self {
            session,
            bridge: CaptureBridge::new(),
            sink,
            pacer,
            console,
            cancel,
            state: RunState::Init,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute the run. The session is stopped on every path out.
    pub fn run(&mut self, device: &DeviceInfo, config: &RunConfig) -> Result<Outcome, SnapError> {
        let result = self.drive(device, config);
        self.session.stop();

        match &result {
            Ok(Outcome::Completed) => self.enter(RunState::Done),
            Ok(Outcome::Interrupted) => {
                self.enter(RunState::Interrupted);
                let notice = match config.mode {
                    Mode::Single { .. } => "Capture stopped.",
                    Mode::Timelapse(_) => "Timelapse stopped.",
                };
                self.console.line(notice);
            }
            Err(err) => {
                tracing::debug!("Run failed: {}", err);
                self.enter(RunState::Failed);
            }
        }

        result
    }

    fn drive(&mut self, device: &DeviceInfo, config: &RunConfig) -> Result<Outcome, SnapError> {
        self.session.setup(device)?;
        self.session.start()?;
        self.enter(RunState::DeviceBound);

        if !self.warm_up(config.warmup) {
            return Ok(Outcome::Interrupted);
        }

        match &config.mode {
            Mode::Single { path } => self.capture_single(path, config.capture_timeout),
            Mode::Timelapse(plan) => self.capture_series(plan, config.capture_timeout),
        }
    }

    /// Print the progress line and one dot per tick. Returns `false` if
    /// interrupted.
    fn warm_up(&mut self, delay: Duration) -> bool {
        let line = format!("Capturing image from device \"{}\"", self.session.device_name());
        self.console.progress(&line);

        if !delay.is_zero() {
            self.enter(RunState::WarmingUp);
        }

        let mut remaining = delay;
        let mut completed = true;
        while !remaining.is_zero() {
            let tick = remaining.min(WARMUP_TICK);
            self.console.progress(".");
            if self.pacer.pause(tick, &self.cancel) {
                completed = false;
                break;
            }
            remaining -= tick;
        }

        self.console.line("");
        completed
    }

    fn capture_single(&mut self, path: &Path, timeout: Duration) -> Result<Outcome, SnapError> {
        if self.cancel.is_cancelled() {
            return Ok(Outcome::Interrupted);
        }

        self.enter(RunState::Capturing(1));
        self.capture_to(path, timeout)?;
        Ok(Outcome::Completed)
    }

    fn capture_series(
        &mut self,
        plan: &TimelapsePlan,
        timeout: Duration,
    ) -> Result<Outcome, SnapError> {
        let mut sequence = Sequence::resume(plan.base.clone());
        tracing::info!(
            "Timelapse every {:?}, starting at frame {:?}",
            plan.interval,
            sequence.next_index()
        );

        let mut capture_count: u64 = 0;
        loop {
            capture_count += 1;
            if plan.max_captures.is_some_and(|max| capture_count > max) {
                break;
            }
            if self.cancel.is_cancelled() {
                return Ok(Outcome::Interrupted);
            }

            self.enter(RunState::Capturing(capture_count));
            let path = sequence.next_path()?;
            self.capture_to(&path, timeout)?;
            sequence.advance();

            if plan.max_captures.is_some_and(|max| capture_count >= max) {
                break;
            }
            if self.pacer.pause(plan.interval, &self.cancel) {
                return Ok(Outcome::Interrupted);
            }
        }

        Ok(Outcome::Completed)
    }

    /// One capture/encode/write cycle, confirming the path on stdout.
    fn capture_to(&mut self, path: &Path, timeout: Duration) -> Result<(), SnapError> {
        let image = self.bridge.capture_photo(&mut self.session, timeout)?;
        self.sink.write_image(&image, path)?;
        self.console.line(&path.display().to_string());
        Ok(())
    }

    fn enter(&mut self, next: RunState) {
        tracing::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
