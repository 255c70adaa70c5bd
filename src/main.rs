mod cancel;
mod capture;
mod console;
mod error;
mod orchestrator;
mod output;
mod sequence;

use anyhow::{Context, Result};
use cancel::CancelToken;
use capture::{CaptureSession, WebcamBackend, DEFAULT_CAPTURE_TIMEOUT};
use clap::Parser;
use console::{Console, Verbosity};
use orchestrator::{Mode, Orchestrator, Outcome, RunConfig, TimelapsePlan, WallClock};
use output::FileSink;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const SUPPORTED_TYPES: &str = "\
If no device is specified, the first available device is used.
If no filename is specified, snapshot.jpg is used.
Supported image types: JPEG, TIFF, PNG, GIF, BMP";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = SUPPORTED_TYPES)]
struct Args {
    /// Verbose mode
    #[arg(short)]
    verbose: bool,

    /// Quiet mode. Do not output any text
    #[arg(short)]
    quiet: bool,

    /// List available video devices
    #[arg(short)]
    list: bool,

    /// Use named video device
    #[arg(short, value_name = "DEVICE")]
    device: Option<String>,

    /// Warmup. Delay snapshot this many seconds after turning on camera
    #[arg(
        short,
        value_name = "SECONDS",
        default_value = "3",
        allow_negative_numbers = true,
        value_parser = warmup_seconds
    )]
    warmup: Duration,

    /// Take a picture every SECONDS seconds
    #[arg(short, value_name = "SECONDS", value_parser = positive_seconds)]
    timelapse: Option<Duration>,

    /// Limit the number of timelapse pictures
    #[arg(short = 'n', value_name = "COUNT", value_parser = clap::value_parser!(u64).range(1..))]
    max_captures: Option<u64>,

    /// Give up on a photo the camera has not delivered after SECONDS
    #[arg(long, value_name = "SECONDS", value_parser = positive_seconds)]
    capture_timeout: Option<Duration>,

    /// Output file; its extension selects the image type
    #[arg(default_value = "snapshot.jpg")]
    filename: PathBuf,
}

fn positive_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("`{value}` must be greater than zero"));
    }
    Duration::try_from_secs_f64(seconds).map_err(|err| err.to_string())
}

/// Zero or negative warm-up means none at all.
fn warmup_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    if seconds.is_nan() {
        return Err(format!("`{value}` is not a number of seconds"));
    }
    if seconds <= 0.0 {
        return Ok(Duration::ZERO);
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| format!("`{value}` seconds is too long"))
}

impl Args {
    fn run_config(&self) -> RunConfig {
        let mode = match self.timelapse {
            Some(interval) => Mode::Timelapse(TimelapsePlan {
                interval,
                max_captures: self.max_captures,
                base: self.filename.clone(),
            }),
            None => Mode::Single {
                path: self.filename.clone(),
            },
        };

        RunConfig {
            warmup: self.warmup,
            capture_timeout: self.capture_timeout.unwrap_or(DEFAULT_CAPTURE_TIMEOUT),
            mode,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    tracing_subscriber::fmt()
        .with_max_level(verbosity.log_level())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = if args.list {
        list_devices().map(|()| Outcome::Completed)
    } else {
        run(&args, verbosity)
    };

    match result {
        Ok(outcome) => {
            tracing::debug!("Finished: {:?}", outcome);
            ExitCode::SUCCESS
        }
        Err(err) => {
            Console::stdio(verbosity).error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

fn list_devices() -> Result<()> {
    let devices = capture::list_devices()?;

    if devices.is_empty() {
        println!("No video devices found.");
        return Ok(());
    }

    println!("Video Devices:");
    for device in &devices {
        println!("=> {}", device.name);
    }
    Ok(())
}

fn run(args: &Args, verbosity: Verbosity) -> Result<Outcome> {
    let config = args.run_config();
    tracing::debug!("Run configuration: {:?}", config);

    capture::ensure_access()?;
    let devices = capture::list_devices()?;
    let device = capture::select_device(&devices, args.device.as_deref())?;
    tracing::info!("Using device \"{}\" (index {})", device.name, device.index);

    let cancel = CancelToken::new();
    if let Err(err) = install_interrupt_handler(&cancel) {
        tracing::warn!("{:#}", err);
    }

    let mut orchestrator = Orchestrator::new(
        CaptureSession::new(WebcamBackend::new()),
        FileSink::new(),
        WallClock,
        Console::stdio(verbosity),
        cancel,
    );

    let outcome = orchestrator.run(device, &config)?;
    Ok(outcome)
}

/// First Ctrl-C stops the run at the next safe point; a second one exits at once.
fn install_interrupt_handler(cancel: &CancelToken) -> Result<()> {
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(130);
        }
        token.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("camsnap").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_to_single_snapshot() {
        let args = parse(&[]);
        let config = args.run_config();

        assert_eq!(config.warmup, Duration::from_secs(3));
        assert_eq!(config.capture_timeout, DEFAULT_CAPTURE_TIMEOUT);
        assert_eq!(
            config.mode,
            Mode::Single {
                path: PathBuf::from("snapshot.jpg")
            }
        );
        assert!(!args.list);
    }

    #[test]
    fn timelapse_flags_build_a_plan() {
        let args = parse(&["-t", "2.5", "-n", "3", "-d", "USB", "-w", "0", "shots/a.png"]);
        let config = args.run_config();

        assert_eq!(args.device.as_deref(), Some("USB"));
        assert_eq!(config.warmup, Duration::ZERO);
        assert_eq!(
            config.mode,
            Mode::Timelapse(TimelapsePlan {
                interval: Duration::from_millis(2500),
                max_captures: Some(3),
                base: PathBuf::from("shots/a.png"),
            })
        );
    }

    #[test]
    fn count_without_interval_is_a_single_capture() {
        let config = parse(&["-n", "4"]).run_config();
        assert!(matches!(config.mode, Mode::Single { .. }));
    }

    #[test]
    fn negative_warmup_means_none() {
        let config = parse(&["-w", "-1.5"]).run_config();
        assert_eq!(config.warmup, Duration::ZERO);
    }

    #[test]
    fn fractional_warmup_is_kept() {
        let config = parse(&["-w", "0.25"]).run_config();
        assert_eq!(config.warmup, Duration::from_millis(250));
    }

    #[test]
    fn unrepresentable_warmup_is_rejected() {
        for value in ["1e30", "inf", "NaN", "later"] {
            let err = Args::try_parse_from(["camsnap", "-w", value]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{value}");
        }
    }

    #[test]
    fn quiet_and_verbose_flags_parse() {
        let args = parse(&["-q", "-v"]);
        assert_eq!(Verbosity::from_flags(args.quiet, args.verbose), Verbosity::Quiet);
    }

    #[test]
    fn rejects_non_positive_interval_and_count() {
        for argv in [
            vec!["camsnap", "-t", "0"],
            vec!["camsnap", "-t", "-2"],
            vec!["camsnap", "-t", "soon"],
            vec!["camsnap", "-t", "1", "-n", "0"],
            vec!["camsnap", "--capture-timeout", "0"],
        ] {
            assert!(Args::try_parse_from(argv.iter().copied()).is_err(), "{argv:?}");
        }
    }

    #[test]
    fn help_is_not_a_failure() {
        let err = Args::try_parse_from(["camsnap", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert!(err.to_string().contains("Supported image types"));
    }
}
