use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use strum_macros::Display;

use crate::effects::{EffectError, Effects, ToolCommand};
use crate::error::JobError;

/// AAC target bitrate handed to the encoder, in bits per second.
const TARGET_BITRATE: &str = "80000";
/// Encoder quality, 0..=127.
const ENCODER_QUALITY: &str = "127";
/// `-s` bitrate allocation strategy: 0 CBR, 1 ABR, 2 VBR constrained, 3 VBR.
const BITRATE_STRATEGY: &str = "2";

const INTERMEDIATE_FLAGS: [&str; 5] = ["-d", "0", "-f", "caff", "--soundcheck-generate"];
const FINAL_FORMAT_FLAGS: [&str; 4] = ["-d", "aach", "-f", "m4af"];

/// Builds the three `afconvert` invocations a conversion may need.
#[derive(Clone, Debug)]
pub struct Transcoder {
    program: String,
}

impl Transcoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn encoder_flags(command: ToolCommand) -> ToolCommand {
        command.args([
            "-b",
            TARGET_BITRATE,
            "-q",
            ENCODER_QUALITY,
            "-s",
            BITRATE_STRATEGY,
        ])
    }

    /// Stage one: source to an uncompressed CAF intermediate with soundcheck data.
    pub fn intermediate_stage(&self, source: &Path, intermediate: &Path) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg(source)
            .arg(intermediate)
            .args(INTERMEDIATE_FLAGS)
    }

    /// Stage two: intermediate to the final AAC file.
    pub fn final_stage(&self, intermediate: &Path, target: &Path) -> ToolCommand {
        let command = ToolCommand::new(&self.program)
            .arg(intermediate)
            .args(FINAL_FORMAT_FLAGS)
            .arg("--soundcheck-read");
        Self::encoder_flags(command).arg(target)
    }

    /// Single-stage fallback straight from source to the final AAC file.
    pub fn direct(&self, source: &Path, target: &Path) -> ToolCommand {
        let command = ToolCommand::new(&self.program)
            .arg(source)
            .arg(target)
            .args(FINAL_FORMAT_FLAGS);
        Self::encoder_flags(command)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    pub intermediate: PathBuf,
}

/// Which attempt produced the output.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Display)]
pub enum Attempt {
    #[strum(serialize = "two-stage")]
    Primary,
    #[strum(serialize = "direct")]
    Fallback,
}

enum State {
    Start,
    PrimaryAttempt,
    PrimaryFailed(EffectError),
    FallbackAttempt(JobError),
    Done(Result<Attempt, JobError>),
}

/// Runs one conversion: two-stage primary, then at most one direct fallback.
/// Every failure ends up in the returned value.
pub struct Conversion<'a> {
    transcoder: &'a Transcoder,
    effects: &'a dyn Effects,
}

impl<'a> Conversion<'a> {
    pub fn new(transcoder: &'a Transcoder, effects: &'a dyn Effects) -> Self {
        Self {
            transcoder,
            effects,
        }
    }

    pub fn run(&self, request: &ConvertRequest) -> Result<Attempt, JobError> {
        let mut state = State::Start;
        loop {
            state = match state {
                State::Start => {
                    info!("converting '{}'", request.source.display());
                    State::PrimaryAttempt
                }
                State::PrimaryAttempt => match self.primary(request) {
                    Ok(()) => State::Done(Ok(Attempt::Primary)),
                    Err(err) => State::PrimaryFailed(err),
                },
                State::PrimaryFailed(source) => {
                    let primary = JobError::PrimaryConversionFailure {
                        path: request.source.clone(),
                        source,
                    };
                    warn!("{}; retrying without intermediate file", primary);
                    State::FallbackAttempt(primary)
                }
                State::FallbackAttempt(primary) => {
                    let command = self.transcoder.direct(&request.source, &request.target);
                    match self.effects.run_tool(&command) {
                        Ok(()) => State::Done(Ok(Attempt::Fallback)),
                        Err(source) => State::Done(Err(JobError::FallbackConversionFailure {
                            path: request.source.clone(),
                            primary: Box::new(primary),
                            source,
                        })),
                    }
                }
                State::Done(result) => return result,
            };
        }
    }

    fn primary(&self, request: &ConvertRequest) -> Result<(), EffectError> {
        self.effects.run_tool(
            &self
                .transcoder
                .intermediate_stage(&request.source, &request.intermediate),
        )?;
        self.effects.run_tool(
            &self
                .transcoder
                .final_stage(&request.intermediate, &request.target),
        )?;
        // Output is complete here; a failed removal only warns.
        match self.effects.remove_file(&request.intermediate) {
            Ok(()) => debug!("removed '{}'", request.intermediate.display()),
            Err(err) => warn!("leaving intermediate behind: {}", err),
        }
        Ok(())
    }
}
