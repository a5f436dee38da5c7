//! GeoJSON point layers
//!
//! Reads and writes `FeatureCollection`s of Point features. The spatial
//! reference travels in the legacy `crs` member
//! (`{"type": "name", "properties": {"name": "EPSG:32617"}}`), which is what
//! desktop GIS exports still write for projected data. A collection without
//! that member is WGS84 longitude/latitude (RFC 7946).

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, FeatureId, PointCollection, PointFeature, PointStore};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::json;
use std::path::Path;
use tracing::debug;

/// Options for writing point layers
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Replace an existing file at the output path
    pub overwrite: bool,
    /// Pretty-print the JSON
    pub pretty: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            pretty: false,
        }
    }
}

/// Read a GeoJSON FeatureCollection of points.
///
/// `name` labels the layer in messages (e.g. "plots").
pub fn read_points<P: AsRef<Path>>(path: P, name: &str) -> Result<PointCollection> {
    let text = std::fs::read_to_string(path.as_ref())?;
    read_points_from_str(&text, name)
}

/// Parse a GeoJSON FeatureCollection of points.
///
/// Features without an `id` get their position in the collection, the way
/// shapefile FIDs are assigned. Without a `crs` member the layer is WGS84.
pub fn read_points_from_str(text: &str, name: &str) -> Result<PointCollection> {
    let collection = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(Error::Format(format!("{}: expected a FeatureCollection", name))),
    };

    let crs = match collection.foreign_members.as_ref().and_then(parse_crs_member) {
        Some(crs) => crs,
        None => {
            debug!("{}: no crs member, reading as WGS84 longitude/latitude", name);
            CRS::wgs84()
        }
    };
    let mut layer = PointCollection::new(name).with_crs(Some(crs));

    for (position, feature) in collection.features.into_iter().enumerate() {
        layer.push(to_point_feature(feature, position, name)?)?;
    }

    Ok(layer)
}

fn parse_crs_member(members: &JsonObject) -> Option<CRS> {
    members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(CRS::from_name)
}

fn to_point_feature(feature: Feature, position: usize, layer: &str) -> Result<PointFeature> {
    let id = match &feature.id {
        Some(Id::String(s)) => FeatureId::Str(s.clone()),
        Some(Id::Number(n)) => match n.as_i64() {
            Some(i) => FeatureId::Int(i),
            None => FeatureId::Str(n.to_string()),
        },
        None => FeatureId::Int(position as i64),
    };

    let coords = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::Point(coords)) if coords.len() >= 2 => coords,
        _ => {
            return Err(Error::Format(format!(
                "{}: feature {} is not a Point",
                layer, id
            )))
        }
    };

    let mut point = PointFeature::new(id, coords[0], coords[1]);
    for (key, value) in feature.properties.into_iter().flatten() {
        point.set_property(key, to_attribute(value));
    }
    Ok(point)
}

fn to_attribute(value: serde_json::Value) -> AttributeValue {
    match value {
        serde_json::Value::Null => AttributeValue::Null,
        serde_json::Value::Bool(b) => AttributeValue::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
        },
        serde_json::Value::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn to_json(value: &AttributeValue) -> serde_json::Value {
    match value {
        AttributeValue::Null => serde_json::Value::Null,
        AttributeValue::Bool(b) => json!(b),
        AttributeValue::Int(i) => json!(i),
        // serde_json maps non-finite floats to null
        AttributeValue::Float(v) => json!(v),
        AttributeValue::String(s) => json!(s),
    }
}

fn to_feature(point: &PointFeature, fields: &[String]) -> Feature {
    let properties: JsonObject = fields
        .iter()
        .map(|field| {
            let value = point
                .get_property(field)
                .map_or(serde_json::Value::Null, to_json);
            (field.clone(), value)
        })
        .collect();

    let id = match &point.id {
        FeatureId::Int(i) => Id::Number((*i).into()),
        FeatureId::Str(s) => Id::String(s.clone()),
    };

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![point.x(), point.y()]))),
        id: Some(id),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn to_feature_collection(layer: &PointCollection) -> FeatureCollection {
    let features = layer.iter().map(|p| to_feature(p, layer.fields())).collect();

    let foreign_members = layer.crs().map(|crs| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            json!({ "type": "name", "properties": { "name": crs.identifier() } }),
        );
        members
    });

    FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

/// Serialize a point layer as a GeoJSON FeatureCollection
pub fn write_points_to_string(layer: &PointCollection, pretty: bool) -> Result<String> {
    let collection = to_feature_collection(layer);
    let text = if pretty {
        serde_json::to_string_pretty(&collection)?
    } else {
        serde_json::to_string(&collection)?
    };
    Ok(text)
}

/// Write a point layer to a GeoJSON file
pub fn write_points<P: AsRef<Path>>(
    layer: &PointCollection,
    path: P,
    options: &WriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    if path.exists() && !options.overwrite {
        return Err(Error::OutputExists(path.display().to_string()));
    }
    let text = write_points_to_string(layer, options.pretty)?;
    std::fs::write(path, text)?;
    Ok(())
}
