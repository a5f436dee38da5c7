//! TSI: z-hat normalized by the sampling radius

use super::{validate_radius, TSI_FIELD, ZHAT_FIELD};
use crate::report::{FailureReason, Stage, StageReport};
use terrashape_core::{Error, FeatureId, PointStore, Result};

/// Terrain Shape Index for a single plot; same sign as z-hat.
#[inline]
pub fn terrain_shape_index(zhat: f64, radius: f64) -> f64 {
    zhat / radius
}

/// Write `tsi = zhat / radius` on every plot.
///
/// Requires the `zhat` field to exist. Plots with a null z-hat get a null TSI
/// and a failure entry. The radius is not checked against the one used to
/// generate the cardinals.
pub fn compute_tsi<P: PointStore + ?Sized>(plots: &mut P, radius: f64) -> Result<StageReport> {
    validate_radius(radius)?;
    if !plots.has_field(ZHAT_FIELD) {
        return Err(Error::PreconditionViolation {
            name: "zhat",
            value: "absent".into(),
            reason: format!("z-hat has not been computed on '{}'", plots.name()),
        });
    }

    plots.add_field(TSI_FIELD);

    let ids: Vec<FeatureId> = plots.points().map(|(id, _, _)| id.clone()).collect();
    let mut report = StageReport::new(Stage::Tsi);
    for id in ids {
        match plots.field_value(&id, ZHAT_FIELD)? {
            Some(zhat) => {
                plots.set_field(&id, TSI_FIELD, Some(terrain_shape_index(zhat, radius)))?;
                report.record_success();
            }
            None => {
                plots.set_field(&id, TSI_FIELD, None)?;
                report.record_failure(id, FailureReason::MissingZHat);
            }
        }
    }

    Ok(report)
}
