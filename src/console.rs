use std::io::{self, Write};

/// How chatty the tool is, chosen once from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    /// Quiet wins over verbose when both are given.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }

    /// Maximum level for the diagnostic subscriber
    pub fn log_level(self) -> tracing::Level {
        match self {
            Verbosity::Quiet => tracing::Level::ERROR,
            Verbosity::Normal => tracing::Level::WARN,
            Verbosity::Verbose => tracing::Level::DEBUG,
        }
    }
}

/// User-facing output: progress and written paths on stdout, errors on
/// stderr. Diagnostics go through `tracing` instead.
pub struct Console {
    verbosity: Verbosity,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl Console {
    pub fn stdio(verbosity: Verbosity) -> Self {
        Self::with_writers(verbosity, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_writers(
        verbosity: Verbosity,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            verbosity,
            out,
            err,
        }
    }

    /// Write without a line break (progress line, warm-up dots).
    pub fn progress(&mut self, text: &str) {
        if self.verbosity != Verbosity::Quiet {
            let _ = write!(self.out, "{text}");
            let _ = self.out.flush();
        }
    }

    pub fn line(&mut self, text: &str) {
        if self.verbosity != Verbosity::Quiet {
            let _ = writeln!(self.out, "{text}");
            let _ = self.out.flush();
        }
    }

    /// Errors are printed even in quiet mode.
    pub fn error(&mut self, text: &str) {
        let _ = writeln!(self.err, "Error: {text}");
        let _ = self.err.flush();
    }
}
