#![allow(dead_code)]

use assert_cmd::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;
use walkdir::WalkDir;

static SCRIPT_LOCK: Mutex<()> = Mutex::new(());

/// Serialises tests that write and execute scripts, so a script is never
/// executed while another thread still holds it open for writing.
pub fn serial() -> MutexGuard<'static, ()> {
    SCRIPT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Files containing `unreadable` fail to probe. `.wav` and `.aif` report 320 kbps,
/// `.m4a` exactly the 130 kbps threshold, everything else 96 kbps.
const PROBE_SCRIPT: &str = r#"#!/bin/sh
echo "$1" >> "__LOG__"
case "$1" in
  *unreadable*) echo "afinfo: cannot open file" >&2; exit 1 ;;
  *.wav|*.aif) echo "File: $1"; echo "bit rate: 320000 bits per second" ;;
  *.m4a) echo "File: $1"; echo "bit rate: 130000 bits per second" ;;
  *) echo "File: $1"; echo "bit rate: 96000 bits per second" ;;
esac
"#;

/// Sources containing `corrupt` fail every stage. Sources containing `stubborn`
/// fail only the first primary stage, so the direct fallback succeeds.
const TRANSCODER_SCRIPT: &str = r#"#!/bin/sh
echo "$@" >> "__LOG__"
case "$1" in
  *corrupt*) echo "afconvert: unsupported data" >&2; exit 1 ;;
  *stubborn*) [ "$4" = "0" ] && exit 1 ;;
esac
case "$2" in
  -*) for out; do :; done ;;
  *) out="$2" ;;
esac
printf 'encoded' > "$out"
"#;

pub struct Library {
    pub tmp: TempDir,
}

impl Library {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let library = Library { tmp };
        fs::create_dir_all(library.tools_dir()).unwrap();
        library.write_script("afinfo", PROBE_SCRIPT, "afinfo.log");
        library.write_script("afconvert", TRANSCODER_SCRIPT, "afconvert.log");
        library
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn tools_dir(&self) -> PathBuf {
        self.root().join("tools")
    }

    fn write_script(&self, name: &str, body: &str, log_name: &str) {
        let log = self.tools_dir().join(log_name);
        let path = self.tools_dir().join(name);
        fs::write(&path, body.replace("__LOG__", &log.to_string_lossy())).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn source_root(&self) -> PathBuf {
        self.root().join("Music").join("iTunes")
    }

    pub fn target_root(&self) -> PathBuf {
        self.root().join("Music").join("Smaller")
    }

    /// Adds a file below the source root.
    pub fn add(&self, relative: &str) -> PathBuf {
        let path = self.source_root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("audio:{relative}")).unwrap();
        path
    }

    pub fn target(&self, relative: &str) -> PathBuf {
        self.target_root().join(relative)
    }

    /// Config pointing both tools at the fake scripts.
    pub fn config_contents(&self) -> String {
        format!(
            "probe_program = \"{}\"\ntranscoder_program = \"{}\"\njobs = 2\n",
            self.tools_dir().join("afinfo").display(),
            self.tools_dir().join("afconvert").display()
        )
    }

    pub fn write_config(&self, name: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, self.config_contents()).unwrap();
        path
    }

    /// The binary, run from the library root with no user config in reach.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("reduce_music").expect("binary built");
        cmd.current_dir(self.root())
            .env("HOME", self.root())
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("REDUCE_MUSIC_CONFIG")
            .env("RUST_LOG", "info");
        cmd
    }

    /// Runs with an explicit config file and returns stdout.
    pub fn run(&self, extra_args: &[&str]) -> String {
        let config = self.write_config("config.toml");
        let mut cmd = self.command();
        cmd.arg("--config-file").arg(&config).args(extra_args);
        let output = cmd.assert().success().get_output().stdout.clone();
        String::from_utf8(output).unwrap()
    }

    fn log_lines(&self, name: &str) -> Vec<String> {
        fs::read_to_string(self.tools_dir().join(name))
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn probe_calls(&self) -> Vec<String> {
        self.log_lines("afinfo.log")
    }

    pub fn transcoder_calls(&self) -> Vec<String> {
        self.log_lines("afconvert.log")
    }
}

/// Every entry below `root`, relative to it, sorted.
pub fn tree(root: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    entries.sort();
    entries
}
