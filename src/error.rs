use std::path::PathBuf;

use crate::effects::EffectError;

/// Failures of the single-threaded planning phase. Any of these halts the run
/// before a single job is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("'{}' is not a music file", .0.display())]
    NotMusicFile(PathBuf),

    #[error("'{}' is not below source root '{}'", path.display(), root.display())]
    OutsideSourceRoot { path: PathBuf, root: PathBuf },

    #[error("failed to scan music library: {0}")]
    Scan(#[from] walkdir::Error),
}

/// Per-file failures. These are captured as values and reported in the summary;
/// they never abort sibling jobs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("probing '{}' failed: {reason}", path.display())]
    ProbeFailure { path: PathBuf, reason: String },

    #[error("converting '{}' failed: {source}", path.display())]
    PrimaryConversionFailure {
        path: PathBuf,
        #[source]
        source: EffectError,
    },

    #[error("direct conversion of '{}' failed: {source}; earlier {primary}", path.display())]
    FallbackConversionFailure {
        path: PathBuf,
        primary: Box<JobError>,
        #[source]
        source: EffectError,
    },

    #[error(
        "'{}' would overwrite '{}', already planned from '{}'",
        path.display(),
        target.display(),
        planned_from.display()
    )]
    TargetCollision {
        path: PathBuf,
        target: PathBuf,
        planned_from: PathBuf,
    },

    #[error("copying '{}' to '{}' failed: {source}", source_path.display(), target.display())]
    CopyFailure {
        source_path: PathBuf,
        target: PathBuf,
        #[source]
        source: EffectError,
    },
}

impl JobError {
    /// Source file the failure belongs to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            JobError::ProbeFailure { path, .. }
            | JobError::PrimaryConversionFailure { path, .. }
            | JobError::FallbackConversionFailure { path, .. }
            | JobError::TargetCollision { path, .. } => path,
            JobError::CopyFailure { source_path, .. } => source_path,
        }
    }
}
