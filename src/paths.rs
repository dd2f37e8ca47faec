//! Pure mapping between the source library and the target tree. Nothing in here
//! touches the filesystem.

use std::path::{Path, PathBuf};

use strum_macros::Display;

use crate::error::PlanError;

/// Extensions considered music, compared case-insensitively.
pub const MUSIC_EXTENSIONS: [&str; 4] = ["mp3", "m4a", "wav", "aif"];

/// Extension of every converted file.
pub const CONTAINER_EXTENSION: &str = "m4a";

const INTERMEDIATE_PREFIX: &str = "intermediate";
const INTERMEDIATE_EXTENSION: &str = "caf";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FileKind {
    Music,
    NotMusic,
}

/// Decision made once per new file by the bitrate classifier.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Classification {
    Convert,
    Copy,
}

pub fn classify(path: &Path) -> FileKind {
    let is_music = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            MUSIC_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false);
    if is_music {
        FileKind::Music
    } else {
        FileKind::NotMusic
    }
}

pub fn is_music(path: &Path) -> bool {
    classify(path) == FileKind::Music
}

/// Replaces the final extension with the container extension.
/// `a.b.mp3` becomes `a.b.m4a`; a path without extension gains one.
pub fn to_container_path(path: &Path) -> PathBuf {
    path.with_extension(CONTAINER_EXTENSION)
}

#[derive(Clone, Debug)]
pub struct PathModel {
    source_root: PathBuf,
    target_root: PathBuf,
    temp_dir: PathBuf,
}

impl PathModel {
    pub fn new(source_root: PathBuf, target_root: PathBuf, temp_dir: PathBuf) -> Self {
        Self {
            source_root,
            target_root,
            temp_dir,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Same relative position under the target root. Callers decide whether the
    /// converted or unconverted form is wanted.
    pub fn to_target_path(&self, path: &Path) -> Result<PathBuf, PlanError> {
        let relative = path
            .strip_prefix(&self.source_root)
            .map_err(|_| PlanError::OutsideSourceRoot {
                path: path.to_path_buf(),
                root: self.source_root.clone(),
            })?;
        Ok(self.target_root.join(relative))
    }

    /// Both places a previous run may have left its output for `path`.
    pub fn candidate_targets(&self, path: &Path) -> Result<[PathBuf; 2], PlanError> {
        let unconverted = self.to_target_path(path)?;
        let converted = to_container_path(&unconverted);
        Ok([unconverted, converted])
    }

    /// Final output location of a job for `path`.
    pub fn target_for(
        &self,
        path: &Path,
        classification: Classification,
    ) -> Result<PathBuf, PlanError> {
        if !is_music(path) {
            return Err(PlanError::NotMusicFile(path.to_path_buf()));
        }
        let target = self.to_target_path(path)?;
        Ok(match classification {
            Classification::Convert => to_container_path(&target),
            Classification::Copy => target,
        })
    }

    pub fn intermediate_path(&self, index: usize) -> PathBuf {
        self.temp_dir.join(format!(
            "{}{}.{}",
            INTERMEDIATE_PREFIX, index, INTERMEDIATE_EXTENSION
        ))
    }
}
