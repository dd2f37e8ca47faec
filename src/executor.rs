use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::{debug, error, info};

use crate::effects::Effects;
use crate::error::JobError;
use crate::paths::Classification;
use crate::plan::{Job, JobId, Task};
use crate::transcode::{Attempt, Conversion, Transcoder};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    Copied,
    Converted(Attempt),
}

#[derive(Debug)]
pub struct JobResult {
    pub id: JobId,
    pub kind: Classification,
    pub outcome: Result<Outcome, JobError>,
}

/// Fixed-size worker pool shared by the probe round and the job round.
pub struct Executor {
    pool: rayon::ThreadPool,
}

impl Executor {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|idx| format!("reduce-music-worker-{}", idx))
            .build()
            .context("Failed to create worker pool")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &rayon::ThreadPool {
        &self.pool
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs every job and blocks until all of them have reported back. Results
    /// are keyed by job id, whatever order the workers finished in.
    pub fn run(
        &self,
        jobs: Vec<Job>,
        transcoder: &Transcoder,
        effects: &dyn Effects,
    ) -> BTreeMap<JobId, JobResult> {
        let (tx, rx) = crossbeam_channel::unbounded();
        info!("Dispatching {} jobs to {} workers", jobs.len(), self.workers());

        self.pool.scope(|scope| {
            for job in jobs {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = execute(&job, transcoder, effects);
                    // The receiver outlives the scope, so this cannot fail.
                    let _ = tx.send(result);
                });
            }
        });
        drop(tx);

        rx.into_iter().map(|result| (result.id, result)).collect()
    }
}

fn execute(job: &Job, transcoder: &Transcoder, effects: &dyn Effects) -> JobResult {
    debug!("{} started: {} '{}'", job.id, job.kind(), job.source().display());
    let outcome = match &job.task {
        Task::Copy { source, target } => effects
            .copy_file(source, target)
            .map(|()| Outcome::Copied)
            .map_err(|err| JobError::CopyFailure {
                source_path: source.clone(),
                target: target.clone(),
                source: err,
            }),
        Task::Convert(request) => Conversion::new(transcoder, effects)
            .run(request)
            .map(Outcome::Converted),
    };

    match &outcome {
        Ok(Outcome::Copied) => debug!("{} copied to '{}'", job.id, job.target().display()),
        Ok(Outcome::Converted(attempt)) => info!(
            "{} converted to '{}' ({})",
            job.id,
            job.target().display(),
            attempt
        ),
        Err(err) => error!("{} failed: {}", job.id, err),
    }

    JobResult {
        id: job.id,
        kind: job.kind(),
        outcome,
    }
}
