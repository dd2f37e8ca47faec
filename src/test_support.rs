//! In-process stand-ins for the probe and transcoder used across unit tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::effects::{EffectError, Effects, ExecutionMode, SimulationGate, ToolCommand};
use crate::error::JobError;
use crate::probe::BitrateProbe;

/// Answers from a table keyed by file name; unknown files fail to probe.
pub struct TableProbe {
    by_name: HashMap<String, u64>,
}

impl TableProbe {
    pub fn new(entries: &[(&str, u64)]) -> Self {
        Self {
            by_name: entries
                .iter()
                .map(|(name, bps)| (name.to_string(), *bps))
                .collect(),
        }
    }
}

impl BitrateProbe for TableProbe {
    fn bitrate(&self, path: &Path) -> Result<u64, JobError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.by_name
            .get(&name)
            .copied()
            .ok_or_else(|| JobError::ProbeFailure {
                path: path.to_path_buf(),
                reason: "no bit rate".into(),
            })
    }
}

/// Real filesystem effects, with `afconvert` emulated by writing the output file.
/// Any tool call whose source file name contains `corrupt` fails.
#[derive(Default)]
pub struct FakeTools {
    pub tool_calls: Mutex<Vec<ToolCommand>>,
}

impl FakeTools {
    pub fn tool_calls(&self) -> Vec<ToolCommand> {
        self.tool_calls.lock().unwrap().clone()
    }

    fn output_of(command: &ToolCommand) -> PathBuf {
        let second = PathBuf::from(&command.args[1]);
        if second.to_string_lossy().starts_with('-') {
            PathBuf::from(command.args.last().unwrap())
        } else {
            second
        }
    }
}

impl Effects for FakeTools {
    fn create_dir_all(&self, dir: &Path) -> Result<(), EffectError> {
        SimulationGate::new(ExecutionMode::Live).create_dir_all(dir)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), EffectError> {
        SimulationGate::new(ExecutionMode::Live).copy_file(from, to)
    }

    fn run_tool(&self, command: &ToolCommand) -> Result<(), EffectError> {
        self.tool_calls.lock().unwrap().push(command.clone());
        let input = PathBuf::from(&command.args[0]);
        if input.to_string_lossy().contains("corrupt") {
            return Err(EffectError::ExitStatus {
                program: command.program.clone(),
                code: Some(1),
                stderr: format!("cannot decode {}", input.display()),
            });
        }
        let output = Self::output_of(command);
        fs::write(&output, b"encoded").map_err(|source| EffectError::Io {
            action: "write",
            path: output,
            source,
        })
    }

    fn remove_file(&self, path: &Path) -> Result<(), EffectError> {
        SimulationGate::new(ExecutionMode::Live).remove_file(path)
    }
}

pub fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"audio").unwrap();
}

/// Every entry below `root`, relative to it, sorted.
pub fn tree(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path() != root)
        .map(|entry| entry.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}
