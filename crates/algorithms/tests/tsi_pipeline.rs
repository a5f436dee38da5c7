//! End-to-end TSI runs through the on-disk formats.
//!
//! Each test writes a GeoTIFF surface and a GeoJSON plot layer to a temporary
//! directory, reads them back the way the CLI does, runs the pipeline and
//! checks the written outputs.

use approx::assert_relative_eq;
use std::path::Path;
use terrashape_algorithms::report::{FailureReason, Stage};
use terrashape_algorithms::tsi::{
    Tsi, TsiParams, DIRECTION_FIELD, PLOT_ID_FIELD, TSI_FIELD, ZHAT_FIELD,
};
use terrashape_core::io::{read_geotiff, read_points, write_geotiff, write_points, WriteOptions};
use terrashape_core::{
    Algorithm, AttributeValue, FeatureId, GeoTransform, PointCollection, PointStore, Raster, CRS,
};

/// 1 m cells over (0..300, 0..400) in UTM 17N, filled with `base`
fn utm_surface(base: f64) -> Raster {
    Raster::filled(400, 300, base)
        .with_transform(GeoTransform::new(0.0, 400.0, 1.0, -1.0))
        .with_crs(CRS::utm(17, true))
}

fn set_at(dem: &mut Raster, x: f64, y: f64, value: f64) {
    let (row, col) = dem
        .transform()
        .cell_at(x, y, dem.rows(), dem.cols())
        .expect("coordinate outside test surface");
    dem.set(row, col, value).unwrap();
}

fn write_plots_geojson(path: &Path, crs: &str, features: &str) {
    let text = format!(
        r#"{{
  "type": "FeatureCollection",
  "crs": {{ "type": "name", "properties": {{ "name": "{crs}" }} }},
  "features": [{features}]
}}"#
    );
    std::fs::write(path, text).unwrap();
}

fn point_feature(id: &str, x: f64, y: f64) -> String {
    format!(
        r#"{{ "type": "Feature", "id": {id}, "geometry": {{ "type": "Point", "coordinates": [{x}, {y}] }}, "properties": {{ "label": {id} }} }}"#
    )
}

#[test]
fn reference_plot_through_files() {
    let dir = tempfile::tempdir().unwrap();

    // Plot at (100, 200), radius 15, cardinals N S E W NE SE NW SW
    let mut dem = utm_surface(0.0);
    set_at(&mut dem, 100.0, 200.0, 50.0);
    let d = 15.0 * std::f64::consts::FRAC_1_SQRT_2;
    let cardinals = [
        (100.0, 215.0, 55.0),
        (100.0, 185.0, 45.0),
        (115.0, 200.0, 60.0),
        (85.0, 200.0, 40.0),
        (100.0 + d, 200.0 + d, 52.0),
        (100.0 + d, 200.0 - d, 48.0),
        (100.0 - d, 200.0 + d, 58.0),
        (100.0 - d, 200.0 - d, 42.0),
    ];
    for &(x, y, z) in &cardinals {
        set_at(&mut dem, x, y, z);
    }
    let dem_path = dir.path().join("dem.tif");
    write_geotiff(&dem, &dem_path).unwrap();

    let plots_path = dir.path().join("plots.geojson");
    write_plots_geojson(&plots_path, "EPSG:32617", &point_feature("1", 100.0, 200.0));

    let plots = read_points(&plots_path, "plots").unwrap();
    let surface = read_geotiff(&dem_path).unwrap();
    let out = Tsi.execute((plots, surface), TsiParams::new(15.0)).unwrap();
    assert_eq!(out.summary.total_failures(), 0);

    let cardinal_path = dir.path().join("cardinals.geojson");
    let plots_out = dir.path().join("plots_out.geojson");
    write_points(&out.cardinals, &cardinal_path, &WriteOptions::default()).unwrap();
    write_points(&out.plots, &plots_out, &WriteOptions::default()).unwrap();

    let plots = read_points(&plots_out, "plots").unwrap();
    let id = FeatureId::Int(1);
    assert_relative_eq!(plots.field_value(&id, ZHAT_FIELD).unwrap().unwrap(), 0.0, epsilon = 1e-12);
    assert_relative_eq!(plots.field_value(&id, TSI_FIELD).unwrap().unwrap(), 0.0, epsilon = 1e-12);
    // Input attributes survive
    assert_eq!(plots.attribute(&id, "label").unwrap(), AttributeValue::Int(1));

    let cardinals = read_points(&cardinal_path, "cardinals").unwrap();
    assert_eq!(cardinals.len(), 8);
    assert_eq!(cardinals.crs().and_then(|c| c.epsg()), Some(32617));
    let expected = [55.0, 45.0, 60.0, 40.0, 52.0, 48.0, 58.0, 42.0];
    for (feature, z) in cardinals.iter().zip(expected) {
        assert_eq!(feature.get_property(PLOT_ID_FIELD), Some(&AttributeValue::Int(1)));
        assert!(matches!(feature.get_property(DIRECTION_FIELD), Some(AttributeValue::String(_))));
        assert_eq!(cardinals.field_value(&feature.id, "elev").unwrap(), Some(z));
    }
}

#[test]
fn uniform_rise_gives_h_over_r() {
    let dir = tempfile::tempdir().unwrap();

    // Plots sit in single-cell pits 3 m below their surroundings
    let mut dem = utm_surface(103.0);
    set_at(&mut dem, 50.5, 50.5, 100.0);
    set_at(&mut dem, 150.5, 300.5, 100.0);
    let dem_path = dir.path().join("dem.tif");
    write_geotiff(&dem, &dem_path).unwrap();

    let plots_path = dir.path().join("plots.geojson");
    let features = [
        point_feature("\"a\"", 50.5, 50.5),
        point_feature("\"b\"", 150.5, 300.5),
    ]
    .join(",");
    write_plots_geojson(&plots_path, "EPSG:32617", &features);

    let plots = read_points(&plots_path, "plots").unwrap();
    let surface = read_geotiff(&dem_path).unwrap();
    let out = Tsi.execute((plots, surface), TsiParams::new(12.0)).unwrap();

    for id in ["a", "b"] {
        let id = FeatureId::from(id);
        assert_relative_eq!(out.plots.field_value(&id, ZHAT_FIELD).unwrap().unwrap(), 3.0);
        assert_relative_eq!(out.plots.field_value(&id, TSI_FIELD).unwrap().unwrap(), 0.25);
    }
}

#[test]
fn nodata_cardinals_are_skipped() {
    let dir = tempfile::tempdir().unwrap();

    let mut dem = utm_surface(10.0);
    dem.set_nodata(Some(-9999.0));
    set_at(&mut dem, 200.5, 100.5, 4.0);
    // Knock out the S, E and W cardinals
    set_at(&mut dem, 200.5, 90.5, -9999.0);
    set_at(&mut dem, 210.5, 100.5, -9999.0);
    set_at(&mut dem, 190.5, 100.5, -9999.0);
    // N carries a different value to show the mean is over the 5 survivors
    set_at(&mut dem, 200.5, 110.5, 16.0);
    let dem_path = dir.path().join("dem.tif");
    write_geotiff(&dem, &dem_path).unwrap();

    let plots_path = dir.path().join("plots.geojson");
    write_plots_geojson(&plots_path, "EPSG:32617", &point_feature("5", 200.5, 100.5));

    let plots = read_points(&plots_path, "plots").unwrap();
    let surface = read_geotiff(&dem_path).unwrap();
    let out = Tsi.execute((plots, surface), TsiParams::new(10.0)).unwrap();

    let sampled = out.summary.stage(Stage::CardinalElevation).unwrap();
    assert_eq!(sampled.succeeded, 5);
    assert!(sampled.failures.iter().all(|f| f.reason == FailureReason::NoData));

    // (12 + 6 * 4) / 5
    let id = FeatureId::Int(5);
    assert_relative_eq!(out.plots.field_value(&id, ZHAT_FIELD).unwrap().unwrap(), 7.2, epsilon = 1e-12);
    assert_relative_eq!(out.plots.field_value(&id, TSI_FIELD).unwrap().unwrap(), 0.72, epsilon = 1e-12);
}

#[test]
fn geographic_plots_on_projected_surface() {
    let dir = tempfile::tempdir().unwrap();

    // 2 km of 10 m cells around the zone 17 central meridian
    let dem = Raster::filled(200, 200, 250.0)
        .with_transform(GeoTransform::new(499_000.0, 4_001_000.0, 10.0, -10.0))
        .with_crs(CRS::utm(17, true));
    let dem_path = dir.path().join("dem.tif");
    write_geotiff(&dem, &dem_path).unwrap();

    let plots_path = dir.path().join("plots.geojson");
    write_plots_geojson(&plots_path, "EPSG:4326", &point_feature("1", -81.0, 36.1447));

    let plots = read_points(&plots_path, "plots").unwrap();
    let surface = read_geotiff(&dem_path).unwrap();
    assert_ne!(plots.crs(), surface.crs());

    // Radius in degrees, roughly 100 m
    let out = Tsi.execute((plots, surface), TsiParams::new(0.001)).unwrap();
    assert_eq!(out.summary.total_failures(), 0);
    assert_eq!(out.cardinals.crs().and_then(|c| c.epsg()), Some(4326));

    let id = FeatureId::Int(1);
    assert_eq!(out.plots.field_value(&id, "elev").unwrap(), Some(250.0));
    assert_eq!(out.plots.field_value(&id, TSI_FIELD).unwrap(), Some(0.0));
}

#[test]
fn plots_without_crs_member_are_lon_lat() {
    let dir = tempfile::tempdir().unwrap();

    let dem = Raster::filled(200, 200, 250.0)
        .with_transform(GeoTransform::new(499_000.0, 4_001_000.0, 10.0, -10.0))
        .with_crs(CRS::utm(17, true));
    let dem_path = dir.path().join("dem.tif");
    write_geotiff(&dem, &dem_path).unwrap();

    let plots_path = dir.path().join("plots.geojson");
    let text = format!(
        r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
        point_feature("1", -81.0, 36.1447)
    );
    std::fs::write(&plots_path, text).unwrap();

    let plots = read_points(&plots_path, "plots").unwrap();
    assert_eq!(plots.crs(), Some(&CRS::wgs84()));
    let surface = read_geotiff(&dem_path).unwrap();

    let out = Tsi.execute((plots, surface), TsiParams::new(0.001)).unwrap();
    assert_eq!(out.summary.total_failures(), 0);
    assert_eq!(out.plots.field_value(&FeatureId::Int(1), "elev").unwrap(), Some(250.0));
}

#[test]
fn nad83_plots_on_wgs84_utm_surface() {
    let dir = tempfile::tempdir().unwrap();

    let mut dem = utm_surface(30.0);
    set_at(&mut dem, 120.5, 220.5, 20.0);
    let dem_path = dir.path().join("dem.tif");
    write_geotiff(&dem, &dem_path).unwrap();

    let plots_path = dir.path().join("plots.geojson");
    write_plots_geojson(&plots_path, "EPSG:26917", &point_feature("7", 120.5, 220.5));

    let plots = read_points(&plots_path, "plots").unwrap();
    let surface = read_geotiff(&dem_path).unwrap();
    assert_eq!(plots.crs().and_then(|c| c.epsg()), Some(26917));
    assert_eq!(surface.crs().and_then(|c| c.epsg()), Some(32617));

    let out = Tsi.execute((plots, surface), TsiParams::new(5.0)).unwrap();
    assert_eq!(out.summary.total_failures(), 0);

    let id = FeatureId::Int(7);
    assert_eq!(out.plots.field_value(&id, "elev").unwrap(), Some(20.0));
    assert_relative_eq!(out.plots.field_value(&id, TSI_FIELD).unwrap().unwrap(), 2.0, epsilon = 1e-12);
}

#[test]
fn refuses_to_overwrite_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cardinals.geojson");
    std::fs::write(&path, "keep me").unwrap();

    let layer = PointCollection::new("cardinals");
    let options = WriteOptions {
        overwrite: false,
        ..Default::default()
    };
    assert!(write_points(&layer, &path, &options).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
}
