use anyhow::Result;
use clap::{value_parser, Parser};
use log::info;
use std::path::PathBuf;

use reduce_music::config::{self, CliOverrides, Config, Settings};
use reduce_music::effects::{ExecutionMode, SimulationGate};
use reduce_music::logging;
use reduce_music::pipeline;
use reduce_music::probe::ToolProbe;

/// Mirrors a music library into a smaller copy: files above the bitrate threshold
/// are converted to AAC, the rest are copied. Files already present in the target
/// from an earlier run are left alone.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Music library to read from (defaults to Music/iTunes)
    #[arg(short = 'm', long = "music-dir", value_parser = value_parser!(PathBuf))]
    music_dir: Option<PathBuf>,

    /// Simulate only: log every action without copying or converting anything
    #[arg(short = 'n', long, default_value_t = false)]
    simulate: bool,

    /// Path to the configuration file
    #[arg(short, long, value_parser = value_parser!(PathBuf))]
    config_file: Option<PathBuf>,

    /// Number of parallel workers (defaults to the number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() -> Result<()> {
    logging::init();

    let args = Args::parse();

    let loaded_config = config::load(args.config_file.as_deref())?;
    let file_config = match loaded_config {
        Some((cfg, source)) => {
            config::log_source(&source);
            cfg
        }
        None => Config::default(),
    };

    let overrides = CliOverrides {
        music_dir: args.music_dir,
        simulate: args.simulate,
        jobs: args.jobs,
    };
    let settings = Settings::resolve(&overrides, &file_config);
    logging::log_settings(&settings);

    let mode = ExecutionMode::from_simulate_flag(settings.simulate);
    if mode == ExecutionMode::Simulate {
        info!("Simulation mode: no files will be written.");
    }
    let gate = SimulationGate::new(mode);
    let probe = ToolProbe::new(settings.probe_program.clone());

    let summary = pipeline::run(&settings, &probe, &gate)?;
    println!("{}", summary);

    Ok(())
}
