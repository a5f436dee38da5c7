//! Raster reprojection by inverse mapping
//!
//! The target grid keeps the source row and column counts and covers the
//! envelope of the densified source boundary in the target CRS. Each target
//! cell center is mapped back into the source and filled from the cell that
//! contains it; cells that map outside the source or onto no-data become NaN.

use crate::parallel::map_indexed;
use terrashape_core::crs::{transformer, CoordinateTransform};
use terrashape_core::{Error, GeoTransform, Raster, Result, CRS};
use tracing::debug;

/// Samples per boundary edge when projecting the source extent
const EDGE_SAMPLES: usize = 20;

/// Reproject `raster` into `target`.
///
/// The source raster must declare its CRS.
pub fn reproject_raster(raster: &Raster, target: &CRS) -> Result<Raster> {
    let source = raster
        .crs()
        .ok_or_else(|| Error::UnsupportedCrs("surface has no CRS".into()))?;
    let transform = transformer(source, target)?;
    reproject_with(raster, target.clone(), &transform)
}

/// Reproject `raster` with an explicit source → target transform.
pub fn reproject_with<T>(raster: &Raster, target_crs: CRS, transform: &T) -> Result<Raster>
where
    T: CoordinateTransform + Sync,
{
    let (rows, cols) = raster.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let (min_x, min_y, max_x, max_y) = projected_extent(raster, transform)?;
    let pixel_width = (max_x - min_x) / cols as f64;
    let pixel_height = (max_y - min_y) / rows as f64;
    let target_gt = GeoTransform::new(min_x, max_y, pixel_width, -pixel_height);

    debug!(
        "Reprojected extent ({:.3}, {:.3}) - ({:.3}, {:.3}), cell {:.4} x {:.4}",
        min_x, min_y, max_x, max_y, pixel_width, pixel_height
    );

    let rows_data = map_indexed(rows, |row| {
        (0..cols)
            .map(|col| {
                let (x, y) = target_gt.pixel_to_geo(col, row);
                transform
                    .inverse(x, y)
                    .and_then(|(sx, sy)| raster.value_at(sx, sy))
                    .unwrap_or(f64::NAN)
            })
            .collect::<Vec<f64>>()
    });

    let data = rows_data.into_iter().flatten().collect();
    let mut out = Raster::from_vec(data, rows, cols)?
        .with_transform(target_gt)
        .with_crs(target_crs);
    out.set_nodata(raster.nodata());
    Ok(out)
}

/// Envelope of the source boundary after transformation
fn projected_extent<T: CoordinateTransform>(
    raster: &Raster,
    transform: &T,
) -> Result<(f64, f64, f64, f64)> {
    let (min_x, min_y, max_x, max_y) = raster.bounds();

    let mut boundary = Vec::with_capacity(EDGE_SAMPLES * 4);
    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / EDGE_SAMPLES as f64;
        let x = min_x + t * (max_x - min_x);
        let y = min_y + t * (max_y - min_y);
        boundary.push((x, min_y));
        boundary.push((max_x, y));
        boundary.push((max_x - t * (max_x - min_x), max_y));
        boundary.push((min_x, max_y - t * (max_y - min_y)));
    }

    let envelope = boundary
        .into_iter()
        .filter_map(|(x, y)| transform.transform(x, y).ok())
        .fold(None, |acc: Option<(f64, f64, f64, f64)>, (x, y)| {
            Some(match acc {
                None => (x, y, x, y),
                Some((a, b, c, d)) => (a.min(x), b.min(y), c.max(x), d.max(y)),
            })
        });

    match envelope {
        Some(extent) if extent.2 > extent.0 && extent.3 > extent.1 => Ok(extent),
        _ => Err(Error::Projection {
            x: min_x,
            y: min_y,
            reason: "surface extent cannot be projected into the target CRS".into(),
        }),
    }
}
