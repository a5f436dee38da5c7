//! Cardinal and sub-cardinal sample points around each plot

use super::{validate_radius, DIRECTION_FIELD, PLOT_ID_FIELD};
use crate::report::{Stage, StageReport};
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;
use terrashape_core::vector::AttributeValue;
use terrashape_core::{PointCollection, PointFeature, PointStore, Result};

/// Compass direction of a sample point relative to its plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    N,
    S,
    E,
    W,
    NE,
    SE,
    NW,
    SW,
}

impl Direction {
    /// Generation order
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::S,
        Direction::E,
        Direction::W,
        Direction::NE,
        Direction::SE,
        Direction::NW,
        Direction::SW,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::S => "S",
            Direction::E => "E",
            Direction::W => "W",
            Direction::NE => "NE",
            Direction::SE => "SE",
            Direction::NW => "NW",
            Direction::SW => "SW",
        }
    }

    /// Unit step (dx, dy); diagonals are scaled by cos 45°
    fn step(self) -> (f64, f64) {
        let d = FRAC_1_SQRT_2;
        match self {
            Direction::N => (0.0, 1.0),
            Direction::S => (0.0, -1.0),
            Direction::E => (1.0, 0.0),
            Direction::W => (-1.0, 0.0),
            Direction::NE => (d, d),
            Direction::SE => (d, -d),
            Direction::NW => (-d, d),
            Direction::SW => (-d, -d),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The 8 points at distance `radius` around (x, y), in [`Direction::ALL`] order.
///
/// `radius` is assumed positive and finite.
pub fn cardinal_offsets(x: f64, y: f64, radius: f64) -> [(Direction, f64, f64); 8] {
    Direction::ALL.map(|dir| {
        let (dx, dy) = dir.step();
        (dir, x + dx * radius, y + dy * radius)
    })
}

/// Build the cardinal layer for every plot.
///
/// Cardinal ids are sequential integers; each point carries its owner in
/// `plot_id` and its compass label in `direction`. The layer inherits the
/// plot CRS.
pub fn generate_cardinals<P>(plots: &P, radius: f64) -> Result<(PointCollection, StageReport)>
where
    P: PointStore + ?Sized,
{
    validate_radius(radius)?;

    let mut cardinals =
        PointCollection::new(format!("{}_cardinals", plots.name())).with_crs(plots.crs().cloned());
    cardinals.add_field(PLOT_ID_FIELD);
    cardinals.add_field(DIRECTION_FIELD);

    let mut report = StageReport::new(Stage::Cardinals);
    let mut next_id: i64 = 0;
    for (plot_id, x, y) in plots.points() {
        for (dir, cx, cy) in cardinal_offsets(x, y, radius) {
            let mut feature = PointFeature::new(next_id, cx, cy);
            feature.set_property(PLOT_ID_FIELD, AttributeValue::from(plot_id));
            feature.set_property(DIRECTION_FIELD, AttributeValue::String(dir.label().into()));
            cardinals.push(feature)?;
            next_id += 1;
        }
        report.record_success();
    }

    Ok((cardinals, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;
    use terrashape_core::{Error, FeatureId, CRS};

    #[test]
    fn test_offsets_lie_on_circle() {
        for &r in &[0.5, 1.0, 15.0, 1234.5] {
            let offsets = cardinal_offsets(100.0, 200.0, r);
            for (_, x, y) in offsets {
                let dist = ((x - 100.0).powi(2) + (y - 200.0).powi(2)).sqrt();
                assert_relative_eq!(dist, r, max_relative = 1e-12);
            }
            for i in 0..8 {
                for j in (i + 1)..8 {
                    let (_, xi, yi) = offsets[i];
                    let (_, xj, yj) = offsets[j];
                    assert!((xi, yi) != (xj, yj), "offsets {} and {} coincide", i, j);
                }
            }
        }
    }

    #[test]
    fn test_offset_order_and_positions() {
        let offsets = cardinal_offsets(100.0, 200.0, 15.0);
        let d = 15.0 * std::f64::consts::FRAC_PI_4.cos();

        let labels: Vec<&str> = offsets.iter().map(|(dir, _, _)| dir.label()).collect();
        assert_eq!(labels, ["N", "S", "E", "W", "NE", "SE", "NW", "SW"]);

        assert_eq!((offsets[0].1, offsets[0].2), (100.0, 215.0));
        assert_eq!((offsets[1].1, offsets[1].2), (100.0, 185.0));
        assert_eq!((offsets[2].1, offsets[2].2), (115.0, 200.0));
        assert_eq!((offsets[3].1, offsets[3].2), (85.0, 200.0));
        assert_relative_eq!(offsets[4].1, 100.0 + d, epsilon = 1e-12);
        assert_relative_eq!(offsets[5].2, 200.0 - d, epsilon = 1e-12);
        assert_relative_eq!(offsets[6].1, 100.0 - d, epsilon = 1e-12);
        assert_relative_eq!(offsets[7].2, 200.0 - d, epsilon = 1e-12);
    }

    #[test]
    fn test_eight_cardinals_per_plot() {
        let mut plots = PointCollection::new("plots").with_crs(Some(CRS::utm(17, true)));
        plots.push(PointFeature::new(7, 0.0, 0.0)).unwrap();
        plots.push(PointFeature::new("b", 50.0, 50.0)).unwrap();
        plots.push(PointFeature::new(42, -10.0, 5.0)).unwrap();

        let (cardinals, report) = generate_cardinals(&plots, 5.0).unwrap();
        assert_eq!(cardinals.len(), 24);
        assert_eq!(report.succeeded, 3);
        assert_eq!(cardinals.crs(), plots.crs());

        let mut per_plot: HashMap<FeatureId, Vec<String>> = HashMap::new();
        for feature in cardinals.iter() {
            let owner = feature
                .get_property(PLOT_ID_FIELD)
                .and_then(AttributeValue::as_feature_id)
                .unwrap();
            let dir = match feature.get_property(DIRECTION_FIELD) {
                Some(AttributeValue::String(s)) => s.clone(),
                other => panic!("bad direction {:?}", other),
            };
            per_plot.entry(owner).or_default().push(dir);
        }

        assert_eq!(per_plot.len(), 3);
        for id in [FeatureId::Int(7), FeatureId::from("b"), FeatureId::Int(42)] {
            assert_eq!(per_plot[&id], ["N", "S", "E", "W", "NE", "SE", "NW", "SW"]);
        }
    }

    #[test]
    fn test_rejects_bad_radius() {
        let plots = PointCollection::new("plots");
        for r in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                generate_cardinals(&plots, r),
                Err(Error::PreconditionViolation { .. })
            ));
        }
    }
}
