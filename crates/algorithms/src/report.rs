//! Per-stage outcome reports
//!
//! Every stage of the TSI pipeline returns a [`StageReport`] listing how many
//! records it completed and which ones it could not, with a reason. Point
//! level failures never abort a stage; they end up here instead.

use std::fmt;
use terrashape_core::{Error, FeatureId};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Cardinals,
    PlotElevation,
    CardinalElevation,
    ZHat,
    Tsi,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Cardinals => "cardinal points",
            Stage::PlotElevation => "plot elevation",
            Stage::CardinalElevation => "cardinal elevation",
            Stage::ZHat => "z-hat",
            Stage::Tsi => "TSI",
        };
        f.write_str(label)
    }
}

/// Why a single record was left without a value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureReason {
    #[error("outside the elevation surface")]
    OutOfBounds,
    #[error("no data on the elevation surface")]
    NoData,
    #[error("plot has no elevation")]
    MissingPlotElevation,
    #[error("no cardinal point has an elevation")]
    NoValidCardinals,
    #[error("cardinal point has no owning plot id")]
    MissingOwner,
    #[error("owning plot {0} does not exist")]
    OrphanCardinal(FeatureId),
    #[error("plot has no z-hat")]
    MissingZHat,
}

impl FailureReason {
    /// Map a per-point sampling error; structural errors give `None`
    pub fn from_sample_error(error: &Error) -> Option<Self> {
        match error {
            Error::SampleOutOfBounds { .. } => Some(FailureReason::OutOfBounds),
            Error::NoDataValue { .. } => Some(FailureReason::NoData),
            _ => None,
        }
    }
}

/// A record the stage could not complete
#[derive(Debug, Clone, PartialEq)]
pub struct PointFailure {
    pub id: FeatureId,
    pub reason: FailureReason,
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    pub succeeded: usize,
    pub failures: Vec<PointFailure>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            succeeded: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, id: FeatureId, reason: FailureReason) {
        debug!("{}: {} {}", self.stage, id, reason);
        self.failures.push(PointFailure { id, reason });
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Reason recorded for `id`, if it failed
    pub fn failure_for(&self, id: &FeatureId) -> Option<&FailureReason> {
        self.failures.iter().find(|f| &f.id == id).map(|f| &f.reason)
    }

    /// Emit the stage summary through `tracing`
    pub fn log(&self) {
        if self.is_clean() {
            info!("{}: {} succeeded", self.stage, self.succeeded);
        } else {
            warn!(
                "{}: {} succeeded, {} failed",
                self.stage,
                self.succeeded,
                self.failed()
            );
        }
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} {:>8} ok {:>8} failed",
            self.stage.to_string(),
            self.succeeded,
            self.failed()
        )
    }
}

/// Reports of a full pipeline run, in execution order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub stages: Vec<StageReport>,
}

impl RunSummary {
    pub fn push(&mut self, report: StageReport) {
        report.log();
        self.stages.push(report);
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn total_failures(&self) -> usize {
        self.stages.iter().map(StageReport::failed).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.stages {
            writeln!(f, "{}", report)?;
        }
        Ok(())
    }
}
