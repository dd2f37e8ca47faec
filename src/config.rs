use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::probe::DEFAULT_BITRATE_THRESHOLD;

pub const CONFIG_ENV_VAR: &str = "REDUCE_MUSIC_CONFIG";

const CONFIG_DIR_NAME: &str = "reduce-music";
const CONFIG_FILE_NAME: &str = "reduce-music.toml";

pub const DEFAULT_EXCLUDED_MARKER: &str = "Podcasts";
pub const DEFAULT_PROBE_PROGRAM: &str = "afinfo";
pub const DEFAULT_TRANSCODER_PROGRAM: &str = "afconvert";
const TEMP_DIR_NAME: &str = "tmp";

pub fn default_source_root() -> PathBuf {
    Path::new("Music").join("iTunes")
}

pub fn default_target_root() -> PathBuf {
    Path::new("Music").join("Smaller")
}

/// Contents of a `reduce-music.toml`. Every key is optional.
#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub source_root: Option<PathBuf>,
    pub target_root: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub bitrate_threshold: Option<u64>,
    pub jobs: Option<usize>,
    pub excluded_marker: Option<String>,
    pub probe_program: Option<String>,
    pub transcoder_program: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli(PathBuf),
    Env(PathBuf),
    Default(PathBuf),
}

/// Loads the first config file found: the CLI path, then `$REDUCE_MUSIC_CONFIG`, then
/// the default locations. An explicitly named file that is missing is an error.
pub fn load(cli_path: Option<&Path>) -> Result<Option<(Config, ConfigSource)>> {
    if let Some(path) = cli_path {
        let config = read_config(path)?;
        return Ok(Some((config, ConfigSource::Cli(path.to_path_buf()))));
    }

    if let Some(env_path) = env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        let path = PathBuf::from(env_path);
        let config = read_config(&path)?;
        return Ok(Some((config, ConfigSource::Env(path))));
    }

    for candidate in default_config_candidates() {
        if candidate.is_file() {
            let config = read_config(&candidate)?;
            return Ok(Some((config, ConfigSource::Default(candidate))));
        }
    }

    Ok(None)
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse configuration file at {}", path.display()))
}

fn default_config_candidates() -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();

    let mut push_unique = |path: PathBuf, out: &mut Vec<PathBuf>| {
        if !path.as_os_str().is_empty() && seen.insert(path.clone()) {
            out.push(path);
        }
    };

    if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME").filter(|val| !val.is_empty()) {
        let mut path = PathBuf::from(xdg_config);
        path.push(CONFIG_DIR_NAME);
        path.push("config.toml");
        push_unique(path, &mut out);
    }

    if let Some(home) = env::var_os("HOME").filter(|val| !val.is_empty()) {
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push(CONFIG_DIR_NAME);
        path.push("config.toml");
        push_unique(path, &mut out);
    }

    if let Ok(current_dir) = env::current_dir() {
        push_unique(current_dir.join(CONFIG_FILE_NAME), &mut out);
    }

    out
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub music_dir: Option<PathBuf>,
    pub simulate: bool,
    pub jobs: Option<usize>,
}

/// Fully resolved run settings, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub temp_dir: PathBuf,
    pub bitrate_threshold: u64,
    pub jobs: usize,
    pub excluded_marker: String,
    pub probe_program: String,
    pub transcoder_program: String,
    pub simulate: bool,
}

impl Settings {
    pub fn resolve(cli: &CliOverrides, config: &Config) -> Self {
        let configured_source = config
            .source_root
            .clone()
            .unwrap_or_else(default_source_root);
        let source_root = match &cli.music_dir {
            Some(dir) if dir.exists() => dir.clone(),
            Some(dir) => {
                warn!(
                    "path {} does not exist; using {}",
                    dir.display(),
                    configured_source.display()
                );
                configured_source
            }
            None => configured_source,
        };

        let target_root = config
            .target_root
            .clone()
            .unwrap_or_else(default_target_root);
        let temp_dir = config
            .temp_dir
            .clone()
            .unwrap_or_else(|| target_root.join(TEMP_DIR_NAME));

        let jobs = cli
            .jobs
            .or(config.jobs)
            .filter(|jobs| *jobs > 0)
            .unwrap_or_else(default_jobs);

        Settings {
            source_root,
            target_root,
            temp_dir,
            bitrate_threshold: config
                .bitrate_threshold
                .unwrap_or(DEFAULT_BITRATE_THRESHOLD),
            jobs,
            excluded_marker: config
                .excluded_marker
                .clone()
                .unwrap_or_else(|| DEFAULT_EXCLUDED_MARKER.to_string()),
            probe_program: config
                .probe_program
                .clone()
                .unwrap_or_else(|| DEFAULT_PROBE_PROGRAM.to_string()),
            transcoder_program: config
                .transcoder_program
                .clone()
                .unwrap_or_else(|| DEFAULT_TRANSCODER_PROGRAM.to_string()),
            simulate: cli.simulate,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

pub fn log_source(source: &ConfigSource) {
    match source {
        ConfigSource::Env(path) => info!(
            "Loaded configuration from '{}' (via {}).",
            path.display(),
            CONFIG_ENV_VAR
        ),
        ConfigSource::Cli(path) | ConfigSource::Default(path) => {
            info!("Loaded configuration from '{}'.", path.display())
        }
    }
}
