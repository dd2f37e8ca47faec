use log::info;

use crate::config::Settings;

/// Logs to stderr without timestamps, `info` unless `RUST_LOG` says otherwise.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .try_init();
}

fn settings_entries(settings: &Settings) -> Vec<(&'static str, String)> {
    vec![
        ("source_root", settings.source_root.display().to_string()),
        ("target_root", settings.target_root.display().to_string()),
        ("temp_dir", settings.temp_dir.display().to_string()),
        (
            "bitrate_threshold",
            format!("{} bps", settings.bitrate_threshold),
        ),
        ("jobs", settings.jobs.to_string()),
        ("excluded_marker", settings.excluded_marker.clone()),
        ("probe_program", settings.probe_program.clone()),
        ("transcoder_program", settings.transcoder_program.clone()),
        ("simulate", settings.simulate.to_string()),
    ]
}

pub fn log_settings(settings: &Settings) {
    let entries = settings_entries(settings);
    info!("Run settings ({} entries):", entries.len());
    for (key, value) in entries {
        info!("  {} = {}", key, value);
    }
}
