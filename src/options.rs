//! Options bag consumed by `TrajectoryPipeline` and its tasks.
//! Constructed either from a JSON setup file, in the style of a
//! `read_setup_from_file`/`SetupFile` pair, or from command-line
//! arguments via `clap`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{MolError, Result};

/// Named-option bag covering the CLI surface. `first_frame`/
/// `last_frame` use `-1` for "to the end"; `first_time`/`last_time`
/// override the frame range when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub trajectory: Vec<String>,
    #[serde(default = "default_first_frame")]
    pub first_frame: i64,
    #[serde(default = "default_last")]
    pub last_frame: i64,
    pub first_time: Option<f64>,
    pub last_time: Option<f64>,
    #[serde(default = "default_skip")]
    pub skip: usize,
    #[serde(default = "default_stride")]
    pub stride: usize,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default)]
    pub log_level: String,
    #[serde(default = "default_log_interval")]
    pub log_interval: usize,
}

fn default_first_frame() -> i64 {
    0
}
fn default_last() -> i64 {
    -1
}
fn default_skip() -> usize {
    0
}
fn default_stride() -> usize {
    1
}
fn default_buffer_size() -> usize {
    crate::constants::DEFAULT_BUFFER_SIZE
}
fn default_log_interval() -> usize {
    crate::constants::DEFAULT_LOG_INTERVAL
}

impl Default for Options {
    fn default() -> Options {
        Options {
            trajectory: Vec::new(),
            first_frame: default_first_frame(),
            last_frame: default_last(),
            first_time: None,
            last_time: None,
            skip: default_skip(),
            stride: default_stride(),
            parallel: false,
            buffer_size: default_buffer_size(),
            log_level: "info".to_string(),
            log_interval: default_log_interval(),
        }
    }
}

impl Options {
    /// Load a JSON setup file, in the style of `read_setup_from_file`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Options> {
        let path_str = path.as_ref().display().to_string();
        let file = File::open(&path).map_err(|e| MolError::IoError { path: path_str.clone(), detail: e.to_string() })?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| MolError::IoError { path: path_str, detail: e.to_string() })
    }

    pub fn from_args() -> Options {
        Cli::parse().into_options()
    }

    /// `last_frame == -1` means "open-ended"; this resolves it against
    /// `total_frames` to a concrete exclusive end index. `skip` shifts
    /// the start past `first_frame` before `stride` decimation begins.
    pub fn resolved_range(&self, total_frames: usize) -> (usize, usize) {
        let first = (self.first_frame.max(0) as usize + self.skip).min(total_frames);
        let last = if self.last_frame < 0 { total_frames } else { (self.last_frame as usize + 1).min(total_frames) };
        (first, last)
    }
}

/// Command-line surface for `src/bin/molcore-run.rs`, mapped onto the
/// same fields as the JSON setup file.
#[derive(Debug, Parser)]
#[command(name = "molcore-run", about = "Run a trajectory pipeline over one or more input files")]
struct Cli {
    /// Input trajectory/topology files, in processing order.
    #[arg(required = true)]
    trajectory: Vec<String>,

    #[arg(long, default_value_t = 0)]
    first_frame: i64,

    #[arg(long, default_value_t = -1)]
    last_frame: i64,

    #[arg(long)]
    first_time: Option<f64>,

    #[arg(long)]
    last_time: Option<f64>,

    #[arg(long, default_value_t = 0)]
    skip: usize,

    #[arg(long, default_value_t = 1)]
    stride: usize,

    #[arg(long)]
    parallel: bool,

    #[arg(long, default_value_t = crate::constants::DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, default_value_t = crate::constants::DEFAULT_LOG_INTERVAL)]
    log_interval: usize,
}

impl Cli {
    fn into_options(self) -> Options {
        Options {
            trajectory: self.trajectory,
            first_frame: self.first_frame,
            last_frame: self.last_frame,
            first_time: self.first_time,
            last_time: self.last_time,
            skip: self.skip,
            stride: self.stride,
            parallel: self.parallel,
            buffer_size: self.buffer_size,
            log_level: self.log_level,
            log_interval: self.log_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_open_ended() {
        let options = Options::default();
        assert_eq!(options.last_frame, -1);
        assert_eq!(options.resolved_range(10), (0, 10));
    }

    #[test]
    fn resolved_range_respects_explicit_last_frame() {
        let mut options = Options::default();
        options.first_frame = 2;
        options.last_frame = 4;
        assert_eq!(options.resolved_range(10), (2, 5));
    }

    #[test]
    fn skip_shifts_the_start_past_first_frame() {
        let mut options = Options::default();
        options.first_frame = 1;
        options.skip = 3;
        assert_eq!(options.resolved_range(10), (4, 10));
    }

    #[test]
    fn skip_past_total_frames_yields_an_empty_range() {
        let mut options = Options::default();
        options.skip = 20;
        assert_eq!(options.resolved_range(10), (10, 10));
    }

    #[test]
    fn from_file_rejects_missing_path() {
        let result = Options::from_file("/nonexistent/path/options.json");
        assert!(result.is_err());
    }
}
