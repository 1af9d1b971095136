use std::fmt;

use rayon::prelude::*;
use thiserror::Error;

use crate::config::{Job, RunParams};
use crate::data::filter::find_anomalies;
use crate::data::loader::load_table;
use crate::data::model::SampleSet;
use crate::data::normalize::normalize;
use crate::data::threshold::{estimate_threshold, Threshold};
use crate::data::writer::write_anomalies;
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Stages and per-pair outcomes
// ---------------------------------------------------------------------------

/// Pipeline step a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configure,
    LoadControl,
    LoadExperimental,
    Normalize,
    EstimateThreshold,
    Filter,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configure => "configure",
            Stage::LoadControl => "load control",
            Stage::LoadExperimental => "load experimental",
            Stage::Normalize => "normalize",
            Stage::EstimateThreshold => "estimate threshold",
            Stage::Filter => "filter",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

/// A pair that could not be processed.
#[derive(Debug, Error)]
#[error("{} vs {}: {stage} failed: {error}", .job.control.display(), .job.experimental.display())]
pub struct PairFailure {
    pub job: Job,
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

/// Summary of a successfully processed pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub job: Job,
    pub shape: (usize, usize),
    pub threshold: Threshold,
    /// Cells left out of threshold fitting because their ratio was not finite.
    pub excluded_samples: usize,
    pub anomalies: usize,
}

// ---------------------------------------------------------------------------
// Single pair
// ---------------------------------------------------------------------------

/// Run load → normalize → estimate → filter → write for one pair.
pub fn run_pair(job: &Job, params: &RunParams) -> std::result::Result<PairReport, PairFailure> {
    let fail = |stage: Stage| {
        move |error: PipelineError| PairFailure {
            job: job.clone(),
            stage,
            error,
        }
    };

    params.validate().map_err(fail(Stage::Configure))?;

    let control = load_table(&job.control).map_err(fail(Stage::LoadControl))?;
    let experimental = load_table(&job.experimental).map_err(fail(Stage::LoadExperimental))?;

    let ratio = normalize(&control, &experimental).map_err(fail(Stage::Normalize))?;

    let (samples, excluded_samples) = SampleSet::from_tables(&experimental, &ratio);
    if excluded_samples > 0 {
        log::warn!(
            "{}: {excluded_samples} cells with a non-finite ratio left out of threshold fitting",
            job.experimental.display()
        );
    }
    let threshold =
        estimate_threshold(&samples, params).map_err(fail(Stage::EstimateThreshold))?;
    log::info!(
        "{}: threshold {:.6} (band {:.6}..{:.6})",
        job.experimental.display(),
        threshold.value(),
        1.0 - threshold.value(),
        1.0 + threshold.value()
    );

    let anomalies =
        find_anomalies(&ratio, &experimental, threshold).map_err(fail(Stage::Filter))?;
    write_anomalies(&anomalies, &job.output).map_err(fail(Stage::Write))?;

    Ok(PairReport {
        job: job.clone(),
        shape: ratio.shape(),
        threshold,
        excluded_samples,
        anomalies: anomalies.len(),
    })
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// How a batch reacts to failures and whether it fans out across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Stop at the first failing pair; later pairs are not attempted.
    pub fail_fast: bool,
    /// Process pairs on the rayon pool. Ignored when `fail_fast` is set.
    pub parallel: bool,
}

/// Outcome of a batch, in manifest order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<PairReport>,
    pub failed: Vec<PairFailure>,
    /// Pairs never attempted because an earlier one failed under `fail_fast`.
    pub skipped: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped == 0
    }
}

/// Process every job with the same parameters.
///
/// Parameters are checked once up front so a bad multiplier or fold count is
/// reported before any file is touched.
pub fn run_batch(jobs: &[Job], params: &RunParams, options: BatchOptions) -> Result<BatchReport> {
    params.validate()?;

    let outcomes: Vec<std::result::Result<PairReport, PairFailure>> =
        if options.parallel && !options.fail_fast {
            jobs.par_iter().map(|job| run_pair(job, params)).collect()
        } else {
            let mut outcomes = Vec::with_capacity(jobs.len());
            for job in jobs {
                let outcome = run_pair(job, params);
                let failed = outcome.is_err();
                outcomes.push(outcome);
                if failed && options.fail_fast {
                    break;
                }
            }
            outcomes
        };

    let mut report = BatchReport {
        skipped: jobs.len() - outcomes.len(),
        ..BatchReport::default()
    };
    for outcome in outcomes {
        match outcome {
            Ok(pair) => report.succeeded.push(pair),
            Err(failure) => {
                log::error!("{failure}");
                report.failed.push(failure);
            }
        }
    }

    log::info!(
        "Batch finished: {} succeeded, {} failed, {} skipped",
        report.succeeded.len(),
        report.failed.len(),
        report.skipped
    );
    Ok(report)
}
