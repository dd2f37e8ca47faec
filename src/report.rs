use std::collections::BTreeMap;
use std::fmt;

use crate::error::JobError;
use crate::executor::JobResult;
use crate::paths::Classification;
use crate::plan::JobId;

/// End-of-run tally. Every planned job is counted whatever its outcome.
#[derive(Debug, Default)]
pub struct Summary {
    pub copy_jobs: usize,
    pub convert_jobs: usize,
    pub copied: usize,
    pub converted: usize,
    pub errors: Vec<JobError>,
}

impl Summary {
    pub fn collect(
        rejected: Vec<JobError>,
        results: BTreeMap<JobId, JobResult>,
    ) -> Self {
        let mut summary = Summary {
            errors: rejected,
            ..Summary::default()
        };
        for result in results.into_values() {
            let succeeded = result.outcome.is_ok();
            match result.kind {
                Classification::Copy => {
                    summary.copy_jobs += 1;
                    summary.copied += usize::from(succeeded);
                }
                Classification::Convert => {
                    summary.convert_jobs += 1;
                    summary.converted += usize::from(succeeded);
                }
            }
            if let Err(err) = result.outcome {
                summary.errors.push(err);
            }
        }
        summary
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files copied - {} files converted.",
            self.copy_jobs, self.convert_jobs
        )?;
        if self.has_errors() {
            write!(f, "\nErrors occurred:")?;
            for err in &self.errors {
                write!(f, "\n{}", err)?;
            }
        }
        Ok(())
    }
}
