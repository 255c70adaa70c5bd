//! Numbered output files for timelapse runs.
//!
//! Frames are written as `<stem>-<index>.<ext>` with the index zero-padded to
//! five digits. A new run scans the target directory once and continues after
//! the highest index already on disk, so reruns never overwrite earlier frames.

use crate::error::SnapError;
use regex::Regex;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Minimum width of the index; larger indices are not truncated.
const INDEX_WIDTH: usize = 5;

/// Extension assumed when the base name has none.
const DEFAULT_EXTENSION: &str = "jpg";

fn extension_of(base: &Path) -> &OsStr {
    base.extension()
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| OsStr::new(DEFAULT_EXTENSION))
}

/// Output path for frame `index` of the series named by `base`.
pub fn generate_filename(base: &Path, index: u64) -> PathBuf {
    let mut name = base.with_extension("").into_os_string();
    name.push(format!("-{index:0width$}.", width = INDEX_WIDTH));
    name.push(extension_of(base));
    PathBuf::from(name)
}

/// First index that is safe to write for the series named by `base`.
///
/// An unreadable or missing directory counts as empty and yields 1. `None`
/// means a frame with the largest representable index already exists.
pub fn starting_index(base: &Path) -> Option<u64> {
    let directory = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let Some(pattern) = series_pattern(base) else {
        return Some(1);
    };

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(
                "Could not scan {} for existing frames ({}), starting at 1",
                directory.display(),
                err
            );
            return Some(1);
        }
    };

    let highest = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            let digits = pattern.captures(name)?.get(1)?.as_str();
            digits.parse::<u64>().ok()
        })
        .max()
        .unwrap_or(0);

    highest.checked_add(1)
}

/// Anchored `<stem>-<digits>.<ext>` matcher for directory entry names.
fn series_pattern(base: &Path) -> Option<Regex> {
    let stem = base.file_stem()?.to_string_lossy();
    let ext = extension_of(base).to_string_lossy();
    let pattern = format!(
        "^{}-([0-9]+)\\.{}$",
        regex::escape(&stem),
        regex::escape(&ext)
    );

    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            tracing::warn!("Invalid sequence pattern {}: {}", pattern, err);
            None
        }
    }
}

/// Running frame counter for one timelapse run.
///
/// Seeded once from disk; never rescanned or decremented afterwards. Once
/// the index space runs out every further frame is refused, never wrapped.
#[derive(Debug, Clone)]
pub struct Sequence {
    base: PathBuf,
    next_index: Option<u64>,
}

impl Sequence {
    /// Continue after the highest frame already present for `base`.
    pub fn resume(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let next_index = starting_index(&base);
        Self { base, next_index }
    }

    /// `None` once no unused index is left
    pub fn next_index(&self) -> Option<u64> {
        self.next_index
    }

    /// Path the next frame will be written to
    pub fn next_path(&self) -> Result<PathBuf, SnapError> {
        match self.next_index {
            Some(index) => Ok(generate_filename(&self.base, index)),
            None => Err(SnapError::SequenceExhausted(self.base.clone())),
        }
    }

    pub fn advance(&mut self) {
        self.next_index = self.next_index.and_then(|index| index.checked_add(1));
    }
}
