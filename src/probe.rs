use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};
use rayon::prelude::*;

use crate::error::JobError;
use crate::paths::Classification;

/// Files above this many bits per second get converted by default.
pub const DEFAULT_BITRATE_THRESHOLD: u64 = 130_000;

const BIT_RATE_LABEL: &str = "bit rate:";
const BIT_RATE_UNIT: &str = "bits per second";

/// Reports the bitrate of an audio file in bits per second.
pub trait BitrateProbe: Send + Sync {
    fn bitrate(&self, path: &Path) -> Result<u64, JobError>;
}

/// Runs an `afinfo`-compatible tool and reads its `bit rate:` line.
#[derive(Clone, Debug)]
pub struct ToolProbe {
    program: String,
}

impl ToolProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl BitrateProbe for ToolProbe {
    fn bitrate(&self, path: &Path) -> Result<u64, JobError> {
        info!("calling {} on '{}'", self.program, path.display());
        let failure = |reason: String| JobError::ProbeFailure {
            path: path.to_path_buf(),
            reason,
        };

        let output = Command::new(&self.program)
            .arg(path)
            .output()
            .map_err(|err| failure(format!("could not run {}: {}", self.program, err)))?;

        if !output.status.success() {
            return Err(failure(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_bit_rate(&stdout).ok_or_else(|| {
            failure(format!(
                "no '{} <n> {}' field in {} output",
                BIT_RATE_LABEL, BIT_RATE_UNIT, self.program
            ))
        })
    }
}

/// Extracts `N` from the first `bit rate: N bits per second` line.
pub fn parse_bit_rate(output: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        let (_, rest) = line.split_once(BIT_RATE_LABEL)?;
        let rest = rest.trim_start();
        let digits_end = rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, unit) = rest.split_at(digits_end);
        if digits.is_empty() || !unit.trim_start().starts_with(BIT_RATE_UNIT) {
            return None;
        }
        digits.parse().ok()
    })
}

/// Strictly above the threshold converts; everything else is copied as-is.
pub fn classify_bitrate(bits_per_second: u64, threshold: u64) -> Classification {
    if bits_per_second > threshold {
        Classification::Convert
    } else {
        Classification::Copy
    }
}

/// New files partitioned by bitrate. A file whose probe failed is in neither set.
#[derive(Debug, Default)]
pub struct Classified {
    pub convert: Vec<PathBuf>,
    pub copy: Vec<PathBuf>,
    pub failures: Vec<JobError>,
}

/// Probes every file on `pool` and partitions the results.
pub fn classify_files(
    pool: &rayon::ThreadPool,
    files: &[PathBuf],
    probe: &dyn BitrateProbe,
    threshold: u64,
) -> Classified {
    let probed: Vec<(&PathBuf, Result<u64, JobError>)> = pool.install(|| {
        files
            .par_iter()
            .map(|path| (path, probe.bitrate(path)))
            .collect()
    });

    let mut classified = Classified::default();
    for (path, result) in probed {
        match result {
            Ok(bps) => match classify_bitrate(bps, threshold) {
                Classification::Convert => classified.convert.push(path.clone()),
                Classification::Copy => classified.copy.push(path.clone()),
            },
            Err(err) => {
                warn!("{}", err);
                classified.failures.push(err);
            }
        }
    }
    classified
}
