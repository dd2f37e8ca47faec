use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{JobError, PlanError};
use crate::paths::{Classification, PathModel};
use crate::probe::Classified;
use crate::transcode::ConvertRequest;

/// Drops every file a previous run already produced output for, in either the
/// copied or the converted form.
pub fn new_work<'a, I>(paths: &PathModel, files: I) -> Result<Vec<PathBuf>, PlanError>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let mut fresh = Vec::new();
    for file in files {
        let candidates = paths.candidate_targets(file)?;
        if let Some(existing) = candidates.iter().find(|target| target.exists()) {
            debug!(
                "'{}' already present as '{}'",
                file.display(),
                existing.display()
            );
            continue;
        }
        fresh.push(file.clone());
    }
    Ok(fresh)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub usize);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job #{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Task {
    Copy { source: PathBuf, target: PathBuf },
    Convert(ConvertRequest),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub task: Task,
}

impl Job {
    pub fn kind(&self) -> Classification {
        match self.task {
            Task::Copy { .. } => Classification::Copy,
            Task::Convert(_) => Classification::Convert,
        }
    }

    pub fn source(&self) -> &Path {
        match &self.task {
            Task::Copy { source, .. } => source,
            Task::Convert(request) => &request.source,
        }
    }

    pub fn target(&self) -> &Path {
        match &self.task {
            Task::Copy { target, .. } => target,
            Task::Convert(request) => &request.target,
        }
    }
}

/// Jobs for one run, plus the files left out because their target was taken.
#[derive(Debug, Default)]
pub struct JobList {
    pub jobs: Vec<Job>,
    pub collisions: Vec<JobError>,
}

impl JobList {
    /// Adds a job unless an earlier one already writes the same target.
    fn push(&mut self, claimed: &mut BTreeMap<PathBuf, PathBuf>, source: &Path, task: Task) {
        let job = Job {
            id: JobId(self.jobs.len()),
            task,
        };
        if let Some(planned_from) = claimed.get(job.target()) {
            let collision = JobError::TargetCollision {
                path: source.to_path_buf(),
                target: job.target().to_path_buf(),
                planned_from: planned_from.clone(),
            };
            warn!("{}", collision);
            self.collisions.push(collision);
            return;
        }
        claimed.insert(job.target().to_path_buf(), source.to_path_buf());
        self.jobs.push(job);
    }
}

/// Copy jobs first, then conversions. Each conversion gets its own intermediate
/// file, numbered from zero. Every target is written by at most one job; the first
/// source to claim it wins.
pub fn build_jobs(paths: &PathModel, classified: &Classified) -> Result<JobList, PlanError> {
    let mut list = JobList {
        jobs: Vec::with_capacity(classified.copy.len() + classified.convert.len()),
        collisions: Vec::new(),
    };
    let mut claimed = BTreeMap::new();

    for source in &classified.copy {
        let target = paths.target_for(source, Classification::Copy)?;
        let task = Task::Copy {
            source: source.clone(),
            target,
        };
        list.push(&mut claimed, source, task);
    }

    for (index, source) in classified.convert.iter().enumerate() {
        let target = paths.target_for(source, Classification::Convert)?;
        let task = Task::Convert(ConvertRequest {
            source: source.clone(),
            target,
            intermediate: paths.intermediate_path(index),
        });
        list.push(&mut claimed, source, task);
    }

    Ok(list)
}

/// Target counterparts of `dirs_to_mirror` plus the temp directory, minus those
/// that already exist.
pub fn dirs_to_create(
    paths: &PathModel,
    dirs_to_mirror: &BTreeSet<PathBuf>,
) -> Result<Vec<PathBuf>, PlanError> {
    let mut dirs = BTreeSet::new();
    for dir in dirs_to_mirror {
        dirs.insert(paths.to_target_path(dir)?);
    }
    dirs.insert(paths.temp_dir().to_path_buf());
    Ok(dirs.into_iter().filter(|dir| !dir.is_dir()).collect())
}
