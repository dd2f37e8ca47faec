//! One complete run: scan, plan, classify, create directories, execute, tally.
//! Everything before [`execute`] is single-threaded apart from the probe round,
//! and any error there stops the run before a job is dispatched.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::config::Settings;
use crate::effects::Effects;
use crate::error::JobError;
use crate::executor::Executor;
use crate::paths::PathModel;
use crate::plan::{build_jobs, dirs_to_create, new_work, Job};
use crate::probe::{classify_files, BitrateProbe};
use crate::report::Summary;
use crate::scan::scan_library;
use crate::transcode::Transcoder;

#[derive(Debug)]
pub struct Plan {
    pub jobs: Vec<Job>,
    pub dirs_to_create: Vec<PathBuf>,
    /// Files that got no job: failed probes and target collisions.
    pub rejected: Vec<JobError>,
}

pub fn path_model(settings: &Settings) -> PathModel {
    PathModel::new(
        settings.source_root.clone(),
        settings.target_root.clone(),
        settings.temp_dir.clone(),
    )
}

/// Works out what this run has to do. Only reads the filesystem and probes.
pub fn plan(
    settings: &Settings,
    executor: &Executor,
    probe: &dyn BitrateProbe,
) -> Result<Plan> {
    let paths = path_model(settings);

    let scan = scan_library(&settings.source_root, &settings.excluded_marker)
        .with_context(|| format!("Failed to scan '{}'", settings.source_root.display()))?;
    let fresh = new_work(&paths, &scan.music_files)?;
    info!(
        "{} music files in '{}', {} of them new",
        scan.music_files.len(),
        settings.source_root.display(),
        fresh.len()
    );

    let classified = classify_files(
        executor.pool(),
        &fresh,
        probe,
        settings.bitrate_threshold,
    );
    info!(
        "{} files to copy, {} files to convert, {} could not be probed",
        classified.copy.len(),
        classified.convert.len(),
        classified.failures.len()
    );

    let dirs_to_create = dirs_to_create(&paths, &scan.dirs_to_mirror)?;
    let job_list = build_jobs(&paths, &classified)?;

    let mut rejected = classified.failures;
    rejected.extend(job_list.collisions);
    Ok(Plan {
        jobs: job_list.jobs,
        dirs_to_create,
        rejected,
    })
}

/// Creates the target directories, then runs every job on the pool.
pub fn execute(
    plan: Plan,
    settings: &Settings,
    executor: &Executor,
    effects: &dyn Effects,
) -> Result<Summary> {
    for dir in &plan.dirs_to_create {
        effects
            .create_dir_all(dir)
            .with_context(|| format!("Failed to prepare target directory '{}'", dir.display()))?;
    }

    let transcoder = Transcoder::new(settings.transcoder_program.clone());
    let results = executor.run(plan.jobs, &transcoder, effects);
    let summary = Summary::collect(plan.rejected, results);
    info!(
        "{}/{} copies and {}/{} conversions succeeded",
        summary.copied, summary.copy_jobs, summary.converted, summary.convert_jobs
    );
    Ok(summary)
}

pub fn run(
    settings: &Settings,
    probe: &dyn BitrateProbe,
    effects: &dyn Effects,
) -> Result<Summary> {
    let executor = Executor::new(settings.jobs)?;
    let plan = plan(settings, &executor, probe)?;
    execute(plan, settings, &executor, effects)
}
