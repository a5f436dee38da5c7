//! Stage sequencing for a full TSI run

use super::{
    compute_tsi, compute_zhat, generate_cardinals, validate_radius, TsiParams, ELEVATION_FIELD,
};
use crate::report::{RunSummary, Stage};
use crate::sampling::{align_surface, sample_points, ElevationSurface};
use terrashape_core::{PointCollection, PointStore, Result};
use tracing::info;

/// What a run produces besides the updated plots
#[derive(Debug, Clone)]
pub struct TsiRun {
    /// Generated cardinal points with their sampled elevation
    pub cardinals: PointCollection,
    pub summary: RunSummary,
}

/// Run every TSI stage on `plots`, in order.
///
/// 1. validate the radius
/// 2. generate 8 cardinals per plot
/// 3. sample plot elevations
/// 4. sample cardinal elevations
/// 5. aggregate z-hat
/// 6. normalize to TSI
///
/// The surface is brought into the plot CRS once and reused for both sampling
/// stages. Stages never abort on a single bad point; the returned summary
/// lists those. Any error returned here is structural.
pub fn run_tsi<P, S>(plots: &mut P, surface: &S, params: &TsiParams) -> Result<TsiRun>
where
    P: PointStore + ?Sized,
    S: ElevationSurface,
{
    validate_radius(params.radius)?;
    info!(
        "TSI on '{}': {} plots, radius {}, {:?} sampling",
        plots.name(),
        plots.len(),
        params.radius,
        params.method
    );

    let mut summary = RunSummary::default();

    let (mut cardinals, report) = generate_cardinals(&*plots, params.radius)?;
    summary.push(report);

    let aligned = align_surface(surface, plots.crs())?;

    summary.push(sample_points(
        plots,
        &*aligned,
        ELEVATION_FIELD,
        params.method,
        Stage::PlotElevation,
    )?);
    summary.push(sample_points(
        &mut cardinals,
        &*aligned,
        ELEVATION_FIELD,
        params.method,
        Stage::CardinalElevation,
    )?);
    drop(aligned);

    summary.push(compute_zhat(plots, &cardinals)?);
    summary.push(compute_tsi(plots, params.radius)?);

    Ok(TsiRun { cardinals, summary })
}
