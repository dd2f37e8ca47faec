//! Every side effect the engine performs goes through [`Effects`]. The production
//! implementation, [`SimulationGate`], either performs the effect or only logs it,
//! depending on the run's [`ExecutionMode`]. Both paths report success the same way,
//! so the control flow above is identical in a dry run.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecutionMode {
    Live,
    Simulate,
}

impl ExecutionMode {
    pub fn from_simulate_flag(simulate: bool) -> Self {
        if simulate {
            ExecutionMode::Simulate
        } else {
            ExecutionMode::Live
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {}: {stderr}", describe_code(*.code))]
    ExitStatus {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// An external tool invocation: program plus arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Side-effecting primitives used while executing jobs.
pub trait Effects: Send + Sync {
    fn create_dir_all(&self, dir: &Path) -> Result<(), EffectError>;
    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), EffectError>;
    fn run_tool(&self, command: &ToolCommand) -> Result<(), EffectError>;
    fn remove_file(&self, path: &Path) -> Result<(), EffectError>;
}

#[derive(Copy, Clone, Debug)]
pub struct SimulationGate {
    mode: ExecutionMode,
}

impl SimulationGate {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    fn simulating(&self, action: fmt::Arguments<'_>) -> bool {
        match self.mode {
            ExecutionMode::Simulate => {
                info!("simulating {}", action);
                true
            }
            ExecutionMode::Live => false,
        }
    }
}

impl Effects for SimulationGate {
    fn create_dir_all(&self, dir: &Path) -> Result<(), EffectError> {
        if self.simulating(format_args!("create directory '{}'", dir.display())) {
            return Ok(());
        }
        debug!("Creating directory '{}'", dir.display());
        fs::create_dir_all(dir).map_err(|source| EffectError::Io {
            action: "create directory",
            path: dir.to_path_buf(),
            source,
        })
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), EffectError> {
        if self.simulating(format_args!(
            "copy '{}' -> '{}'",
            from.display(),
            to.display()
        )) {
            return Ok(());
        }
        debug!("Copying '{}' -> '{}'", from.display(), to.display());
        fs::copy(from, to).map(|_| ()).map_err(|source| EffectError::Io {
            action: "copy",
            path: from.to_path_buf(),
            source,
        })
    }

    fn run_tool(&self, command: &ToolCommand) -> Result<(), EffectError> {
        if self.simulating(format_args!("call to {}", command)) {
            return Ok(());
        }
        debug!("Running {}", command);
        let output = Command::new(&command.program)
            .args(&command.args)
            .output()
            .map_err(|source| EffectError::Spawn {
                program: command.program.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        Err(EffectError::ExitStatus {
            program: command.program.clone(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn remove_file(&self, path: &Path) -> Result<(), EffectError> {
        if self.simulating(format_args!("removal of '{}'", path.display())) {
            return Ok(());
        }
        debug!("Removing '{}'", path.display());
        fs::remove_file(path).map_err(|source| EffectError::Io {
            action: "remove",
            path: path.to_path_buf(),
            source,
        })
    }
}
