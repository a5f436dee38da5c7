//! Elevation sampling
//!
//! Reads a continuous elevation surface at arbitrary map coordinates and
//! writes the result onto a point layer. When the layer and the surface use
//! different spatial references, the surface is reprojected once into the
//! layer's CRS before any point is sampled; the reprojected copy lives only
//! for the duration of the batch.

mod interpolate;
mod reproject;

pub use reproject::{reproject_raster, reproject_with};

use crate::parallel::map_indexed;
use crate::report::{FailureReason, Stage, StageReport};
use std::ops::Deref;
use terrashape_core::crs::same_projection;
use terrashape_core::{FeatureId, PointStore, Raster, Result, CRS};
use tracing::{debug, info, warn};

/// How a surface value is read at a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleMethod {
    /// Value of the cell containing the coordinate
    #[default]
    Nearest,
    /// Bilinear blend of the four nearest cell centers
    Bilinear,
}

/// A continuous elevation field that can be sampled and reprojected.
pub trait ElevationSurface: Sync {
    /// Spatial reference of the surface, if declared
    fn crs(&self) -> Option<&CRS>;

    /// Elevation at (x, y) in the surface's own CRS.
    ///
    /// Fails with `SampleOutOfBounds` outside the coverage and `NoDataValue`
    /// where the surface has no measurement.
    fn elevation(&self, x: f64, y: f64, method: SampleMethod) -> Result<f64>;

    /// Copy of the surface in `target` coordinates
    fn reproject(&self, target: &CRS) -> Result<Self>
    where
        Self: Sized;
}

impl ElevationSurface for Raster {
    fn crs(&self) -> Option<&CRS> {
        Raster::crs(self)
    }

    fn elevation(&self, x: f64, y: f64, method: SampleMethod) -> Result<f64> {
        match method {
            SampleMethod::Nearest => self.value_at(x, y),
            SampleMethod::Bilinear => interpolate::bilinear(self, x, y),
        }
    }

    fn reproject(&self, target: &CRS) -> Result<Self> {
        reproject_raster(self, target)
    }
}

/// Sample a single coordinate
pub fn sample<S: ElevationSurface>(surface: &S, x: f64, y: f64, method: SampleMethod) -> Result<f64> {
    surface.elevation(x, y, method)
}

/// A surface borrowed as-is or reprojected for one batch
pub enum AlignedSurface<'a, S> {
    Borrowed(&'a S),
    Reprojected(S),
}

impl<S> AlignedSurface<'_, S> {
    pub fn is_reprojected(&self) -> bool {
        matches!(self, AlignedSurface::Reprojected(_))
    }
}

impl<S> Deref for AlignedSurface<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        match self {
            AlignedSurface::Borrowed(s) => *s,
            AlignedSurface::Reprojected(s) => s,
        }
    }
}

/// Bring `surface` into `crs`, reprojecting only when the two differ.
///
/// CRSs that resolve to the same projection (e.g. NAD83 and WGS84 UTM zone 17)
/// are a match. A surface without a CRS is assumed to be in the points' CRS.
pub fn align_surface<'a, S: ElevationSurface>(
    surface: &'a S,
    crs: Option<&CRS>,
) -> Result<AlignedSurface<'a, S>> {
    match (crs, surface.crs()) {
        (Some(points), Some(own)) if points.is_equivalent(own) => {
            Ok(AlignedSurface::Borrowed(surface))
        }
        (Some(points), Some(own)) if same_projection(points, own) => {
            debug!("{} and {} share a projection; sampling without reprojection", own, points);
            Ok(AlignedSurface::Borrowed(surface))
        }
        (Some(points), Some(own)) => {
            info!("Reprojecting elevation surface from {} to {}", own, points);
            Ok(AlignedSurface::Reprojected(surface.reproject(points)?))
        }
        (_, None) => {
            warn!("Elevation surface has no CRS; assuming it matches the points");
            Ok(AlignedSurface::Borrowed(surface))
        }
        (None, Some(own)) => {
            warn!("Points have no CRS; assuming they are in {}", own);
            Ok(AlignedSurface::Borrowed(surface))
        }
    }
}

/// Sample every point of `points` into `field` from an already aligned
/// surface.
///
/// The field is declared if absent. Points that cannot be sampled get a null
/// value and a failure entry; any other error aborts before a value is
/// written.
pub fn sample_points<P, S>(
    points: &mut P,
    surface: &S,
    field: &str,
    method: SampleMethod,
    stage: Stage,
) -> Result<StageReport>
where
    P: PointStore + ?Sized,
    S: ElevationSurface,
{
    points.add_field(field);

    let coords: Vec<(FeatureId, f64, f64)> = points
        .points()
        .map(|(id, x, y)| (id.clone(), x, y))
        .collect();

    let results = map_indexed(coords.len(), |i| {
        let (_, x, y) = &coords[i];
        surface.elevation(*x, *y, method)
    });

    let outcomes = results
        .into_iter()
        .map(|result| match result {
            Ok(z) => Ok(Ok(z)),
            Err(e) => FailureReason::from_sample_error(&e).map(Err).ok_or(e),
        })
        .collect::<Result<Vec<_>>>()?;

    let mut report = StageReport::new(stage);
    for ((id, _, _), outcome) in coords.into_iter().zip(outcomes) {
        match outcome {
            Ok(z) => {
                points.set_field(&id, field, Some(z))?;
                report.record_success();
            }
            Err(reason) => {
                points.set_field(&id, field, None)?;
                report.record_failure(id, reason);
            }
        }
    }

    Ok(report)
}

/// Align `surface` to the CRS of `points`, then sample every point.
pub fn sample_aligned<P, S>(
    points: &mut P,
    surface: &S,
    field: &str,
    method: SampleMethod,
    stage: Stage,
) -> Result<StageReport>
where
    P: PointStore + ?Sized,
    S: ElevationSurface,
{
    let aligned = align_surface(surface, points.crs())?;
    sample_points(points, &*aligned, field, method, stage)
}
