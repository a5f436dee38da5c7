//! # terrashape algorithms
//!
//! Terrain shape analysis on point layers.
//!
//! ## Modules
//!
//! - **sampling**: elevation lookup at map coordinates, surface reprojection
//! - **tsi**: cardinal point generation, z-hat aggregation, Terrain Shape Index
//! - **report**: per-stage success/failure summaries

mod parallel;
pub mod report;
pub mod sampling;
pub mod tsi;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::report::{FailureReason, PointFailure, RunSummary, Stage, StageReport};
    pub use crate::sampling::{
        align_surface, reproject_raster, sample, sample_aligned, sample_points, ElevationSurface,
        SampleMethod,
    };
    pub use crate::tsi::{
        cardinal_offsets, compute_tsi, compute_zhat, generate_cardinals, run_tsi, Direction, Tsi,
        TsiOutput, TsiParams, TsiRun,
    };
    pub use terrashape_core::prelude::*;
}
