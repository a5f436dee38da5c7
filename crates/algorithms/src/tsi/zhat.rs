//! z-hat: mean elevation difference between a plot and its cardinal points

use super::{ELEVATION_FIELD, PLOT_ID_FIELD, ZHAT_FIELD};
use crate::report::{FailureReason, Stage, StageReport};
use std::collections::HashMap;
use terrashape_core::{Error, FeatureId, PointStore, Result};
use tracing::debug;

/// Mean of `cardinal - plot_z` over the given cardinal elevations.
///
/// `None` when the list is empty.
pub fn zhat_of(plot_z: f64, cardinal_z: &[f64]) -> Option<f64> {
    if cardinal_z.is_empty() {
        return None;
    }
    let sum: f64 = cardinal_z.iter().map(|z| z - plot_z).sum();
    Some(sum / cardinal_z.len() as f64)
}

fn require_field<P: PointStore + ?Sized>(points: &P, field: &str) -> Result<()> {
    if points.has_field(field) {
        Ok(())
    } else {
        Err(Error::SchemaViolation {
            field: field.to_string(),
            collection: points.name().to_string(),
        })
    }
}

/// Aggregate cardinal elevations into `zhat` on every plot.
///
/// Cardinals are grouped by the plot id they carry, never by position. Only
/// cardinals with an elevation contribute, and the mean is taken over those.
/// Plots without an elevation or without any contributing cardinal get a
/// null z-hat. Cardinals whose owner is missing or unknown are reported under
/// their own id.
pub fn compute_zhat<P, C>(plots: &mut P, cardinals: &C) -> Result<StageReport>
where
    P: PointStore + ?Sized,
    C: PointStore + ?Sized,
{
    require_field(plots, ELEVATION_FIELD)?;
    require_field(cardinals, ELEVATION_FIELD)?;
    require_field(cardinals, PLOT_ID_FIELD)?;

    let plot_ids: Vec<FeatureId> = plots.points().map(|(id, _, _)| id.clone()).collect();
    let mut groups: HashMap<FeatureId, Vec<f64>> =
        plot_ids.iter().map(|id| (id.clone(), Vec::new())).collect();

    let mut report = StageReport::new(Stage::ZHat);

    for (cid, _, _) in cardinals.points() {
        let Some(owner) = cardinals.attribute(cid, PLOT_ID_FIELD)?.as_feature_id() else {
            report.record_failure(cid.clone(), FailureReason::MissingOwner);
            continue;
        };
        let Some(group) = groups.get_mut(&owner) else {
            report.record_failure(cid.clone(), FailureReason::OrphanCardinal(owner));
            continue;
        };
        if let Some(z) = cardinals.field_value(cid, ELEVATION_FIELD)? {
            group.push(z);
        }
    }

    plots.add_field(ZHAT_FIELD);

    for id in plot_ids {
        let Some(plot_z) = plots.field_value(&id, ELEVATION_FIELD)? else {
            plots.set_field(&id, ZHAT_FIELD, None)?;
            report.record_failure(id, FailureReason::MissingPlotElevation);
            continue;
        };
        let contributing = groups.get(&id).map(Vec::as_slice).unwrap_or_default();
        match zhat_of(plot_z, contributing) {
            Some(zhat) => {
                debug!("plot {}: z-hat {:.4} from {} cardinals", id, zhat, contributing.len());
                plots.set_field(&id, ZHAT_FIELD, Some(zhat))?;
                report.record_success();
            }
            None => {
                plots.set_field(&id, ZHAT_FIELD, None)?;
                report.record_failure(id, FailureReason::NoValidCardinals);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terrashape_core::vector::AttributeValue;
    use terrashape_core::{PointCollection, PointFeature};

    fn plot_layer(plots: &[(i64, Option<f64>)]) -> PointCollection {
        let mut layer = PointCollection::new("plots");
        layer.add_field(ELEVATION_FIELD);
        for &(id, z) in plots {
            let mut f = PointFeature::new(id, id as f64 * 100.0, 0.0);
            f.set_property(ELEVATION_FIELD, z.into());
            layer.push(f).unwrap();
        }
        layer
    }

    fn cardinal_layer(cardinals: &[(AttributeValue, Option<f64>)]) -> PointCollection {
        let mut layer = PointCollection::new("cardinals");
        layer.add_field(PLOT_ID_FIELD);
        layer.add_field(ELEVATION_FIELD);
        for (i, (owner, z)) in cardinals.iter().enumerate() {
            let mut f = PointFeature::new(i as i64, 0.0, 0.0);
            f.set_property(PLOT_ID_FIELD, owner.clone());
            f.set_property(ELEVATION_FIELD, (*z).into());
            layer.push(f).unwrap();
        }
        layer
    }

    fn owned_by(plot: i64, zs: &[Option<f64>]) -> Vec<(AttributeValue, Option<f64>)> {
        zs.iter().map(|&z| (AttributeValue::Int(plot), z)).collect()
    }

    #[test]
    fn test_zhat_of() {
        assert_eq!(zhat_of(10.0, &[]), None);
        assert_eq!(zhat_of(10.0, &[10.0; 8]), Some(0.0));
        assert_relative_eq!(zhat_of(50.0, &[55.0, 45.0, 60.0, 40.0, 52.0, 48.0, 58.0, 42.0]).unwrap(), 0.0);
        assert_relative_eq!(zhat_of(0.0, &[1.0, 2.0, 6.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_uniform_offset() {
        let mut plots = plot_layer(&[(1, Some(100.0))]);
        let cardinals = cardinal_layer(&owned_by(1, &[Some(103.5); 8]));

        let report = compute_zhat(&mut plots, &cardinals).unwrap();
        assert!(report.is_clean());
        assert_relative_eq!(
            plots.field_value(&FeatureId::Int(1), ZHAT_FIELD).unwrap().unwrap(),
            3.5
        );
    }

    #[test]
    fn test_partial_cardinals_use_contributing_count() {
        let mut plots = plot_layer(&[(1, Some(10.0))]);
        let zs = [Some(12.0), None, Some(16.0), None, None, Some(11.0), None, None];
        let cardinals = cardinal_layer(&owned_by(1, &zs));

        compute_zhat(&mut plots, &cardinals).unwrap();
        // (2 + 6 + 1) / 3, not / 8
        assert_relative_eq!(
            plots.field_value(&FeatureId::Int(1), ZHAT_FIELD).unwrap().unwrap(),
            3.0
        );
    }

    #[test]
    fn test_no_valid_cardinals_is_not_fatal() {
        let mut plots = plot_layer(&[(1, Some(10.0)), (2, Some(20.0)), (3, None)]);
        let mut rows = owned_by(1, &[None; 8]);
        rows.extend(owned_by(2, &[Some(22.0); 8]));
        rows.extend(owned_by(3, &[Some(5.0); 8]));
        let cardinals = cardinal_layer(&rows);

        let report = compute_zhat(&mut plots, &cardinals).unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(
            report.failure_for(&FeatureId::Int(1)),
            Some(&FailureReason::NoValidCardinals)
        );
        assert_eq!(
            report.failure_for(&FeatureId::Int(3)),
            Some(&FailureReason::MissingPlotElevation)
        );
        assert_eq!(plots.field_value(&FeatureId::Int(1), ZHAT_FIELD).unwrap(), None);
        assert_eq!(plots.field_value(&FeatureId::Int(2), ZHAT_FIELD).unwrap(), Some(2.0));
        assert_eq!(plots.field_value(&FeatureId::Int(3), ZHAT_FIELD).unwrap(), None);
    }

    #[test]
    fn test_grouping_follows_ids_not_positions() {
        // Plot ids are sparse and cardinals arrive interleaved
        let mut plots = plot_layer(&[(10, Some(0.0)), (3, Some(100.0))]);
        let mut rows = Vec::new();
        for _ in 0..8 {
            rows.push((AttributeValue::Int(3), Some(104.0)));
            rows.push((AttributeValue::Int(10), Some(-2.0)));
        }
        let cardinals = cardinal_layer(&rows);

        compute_zhat(&mut plots, &cardinals).unwrap();
        assert_eq!(plots.field_value(&FeatureId::Int(10), ZHAT_FIELD).unwrap(), Some(-2.0));
        assert_eq!(plots.field_value(&FeatureId::Int(3), ZHAT_FIELD).unwrap(), Some(4.0));
    }

    #[test]
    fn test_orphans_are_reported() {
        let mut plots = plot_layer(&[(1, Some(0.0))]);
        let mut rows = owned_by(1, &[Some(1.0); 8]);
        rows.push((AttributeValue::Int(99), Some(50.0)));
        rows.push((AttributeValue::Null, Some(50.0)));
        let cardinals = cardinal_layer(&rows);

        let report = compute_zhat(&mut plots, &cardinals).unwrap();
        assert_eq!(
            report.failure_for(&FeatureId::Int(8)),
            Some(&FailureReason::OrphanCardinal(FeatureId::Int(99)))
        );
        assert_eq!(
            report.failure_for(&FeatureId::Int(9)),
            Some(&FailureReason::MissingOwner)
        );
        assert_eq!(plots.field_value(&FeatureId::Int(1), ZHAT_FIELD).unwrap(), Some(1.0));
    }

    #[test]
    fn test_missing_elevation_field() {
        let mut plots = PointCollection::new("plots");
        plots.push(PointFeature::new(1, 0.0, 0.0)).unwrap();
        let cardinals = cardinal_layer(&owned_by(1, &[Some(1.0); 8]));

        let err = compute_zhat(&mut plots, &cardinals).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref field, .. } if field == ELEVATION_FIELD));
    }
}
