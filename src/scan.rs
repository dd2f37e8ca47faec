use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::PlanError;
use crate::paths::is_music;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Music files below the source root.
    pub music_files: BTreeSet<PathBuf>,
    /// Source directories holding at least one music file directly.
    pub dirs_to_mirror: BTreeSet<PathBuf>,
}

/// True when the directory's position below `root` contains `marker`.
fn is_excluded(entry: &DirEntry, root: &Path, marker: &str) -> bool {
    if marker.is_empty() || !entry.file_type().is_dir() {
        return false;
    }
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    relative.to_string_lossy().contains(marker)
}

/// Walks `root` once. Directories whose path contains `excluded_marker` are pruned
/// together with everything beneath them.
pub fn scan_library(root: &Path, excluded_marker: &str) -> Result<ScanResult, PlanError> {
    let mut result = ScanResult::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let skip = is_excluded(entry, root, excluded_marker);
            if skip {
                debug!("Skipping excluded directory '{}'", entry.path().display());
            }
            !skip
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_music(entry.path()) {
            continue;
        }
        let path = entry.into_path();
        if let Some(parent) = path.parent() {
            result.dirs_to_mirror.insert(parent.to_path_buf());
        }
        result.music_files.insert(path);
    }

    debug!(
        "Scan of '{}' found {} music files in {} directories",
        root.display(),
        result.music_files.len(),
        result.dirs_to_mirror.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::touch;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn collects_music_and_their_directories() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("iTunes");
        touch(&root.join("Artist/Album/01.mp3"));
        touch(&root.join("Artist/Album/02.WAV"));
        touch(&root.join("Artist/Album/cover.jpg"));
        touch(&root.join("Artist/notes.txt"));
        fs::create_dir_all(root.join("Empty")).unwrap();

        let result = scan_library(&root, "Podcasts").unwrap();

        let files: Vec<_> = result.music_files.iter().cloned().collect();
        assert_eq!(
            files,
            vec![
                root.join("Artist/Album/01.mp3"),
                root.join("Artist/Album/02.WAV"),
            ]
        );
        let dirs: Vec<_> = result.dirs_to_mirror.iter().cloned().collect();
        assert_eq!(dirs, vec![root.join("Artist/Album")]);
    }

    #[test]
    fn excluded_subtree_is_pruned() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("iTunes");
        touch(&root.join("Podcasts/Show/ep1.mp3"));
        touch(&root.join("Old Podcasts Archive/ep2.m4a"));
        touch(&root.join("Music/Band/song.aif"));

        let result = scan_library(&root, "Podcasts").unwrap();

        assert_eq!(result.music_files.len(), 1);
        assert!(result.music_files.contains(&root.join("Music/Band/song.aif")));
        assert!(result
            .dirs_to_mirror
            .iter()
            .all(|dir| !dir.to_string_lossy().contains("Podcasts")));
    }

    #[test]
    fn marker_above_root_does_not_exclude_library() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("Podcasts").join("library");
        touch(&root.join("a.mp3"));

        let result = scan_library(&root, "Podcasts").unwrap();
        assert_eq!(result.music_files.len(), 1);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = scan_library(&tmp.path().join("nope"), "Podcasts").unwrap_err();
        assert!(matches!(err, PlanError::Scan(_)));
    }
}
