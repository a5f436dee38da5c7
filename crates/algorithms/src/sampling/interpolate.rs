//! Bilinear interpolation between cell centers

use terrashape_core::{Error, Raster, Result};

/// Bilinear value at map coordinate (x, y).
///
/// The coordinate must fall inside the grid. Near the outer half-cell the
/// position is clamped to the outermost centers. Neighbours that carry zero
/// weight are not read, so a point sitting exactly on a cell center only
/// needs that one cell to be valid.
pub(crate) fn bilinear(raster: &Raster, x: f64, y: f64) -> Result<f64> {
    let (rows, cols) = raster.shape();
    raster
        .transform()
        .cell_at(x, y, rows, cols)
        .ok_or(Error::SampleOutOfBounds { x, y })?;

    let (col, row) = raster.geo_to_pixel(x, y);
    let fx = (col - 0.5).clamp(0.0, (cols - 1) as f64);
    let fy = (row - 0.5).clamp(0.0, (rows - 1) as f64);

    let c0 = fx.floor() as usize;
    let r0 = fy.floor() as usize;
    let c1 = (c0 + 1).min(cols - 1);
    let r1 = (r0 + 1).min(rows - 1);
    let tx = fx - c0 as f64;
    let ty = fy - r0 as f64;

    let neighbours = [
        (r0, c0, (1.0 - tx) * (1.0 - ty)),
        (r0, c1, tx * (1.0 - ty)),
        (r1, c0, (1.0 - tx) * ty),
        (r1, c1, tx * ty),
    ];

    let mut value = 0.0;
    for (r, c, w) in neighbours {
        if w == 0.0 {
            continue;
        }
        let z = raster.get(r, c)?;
        if raster.is_nodata(z) {
            return Err(Error::NoDataValue { x, y });
        }
        value += w * z;
    }

    Ok(value)
}
