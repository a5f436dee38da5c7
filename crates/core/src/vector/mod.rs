//! Point feature collections
//!
//! A [`PointCollection`] is an in-memory layer of point features with a
//! declared attribute schema. Algorithms talk to it through the
//! [`PointStore`] trait, so other storage backends can stand in for it.

use crate::crs::CRS;
use crate::error::{Error, Result};
use geo_types::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable feature identifier (numeric FID or string id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Int(i64),
    Str(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Int(i) => write!(f, "{}", i),
            FeatureId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for FeatureId {
    fn from(id: i64) -> Self {
        FeatureId::Int(id)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        FeatureId::Str(id.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(id: String) -> Self {
        FeatureId::Str(id)
    }
}

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value; `None` for null and non-numeric values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    /// Interpret the value as a reference to another feature
    pub fn as_feature_id(&self) -> Option<FeatureId> {
        match self {
            AttributeValue::Int(i) => Some(FeatureId::Int(*i)),
            AttributeValue::String(s) => Some(FeatureId::Str(s.clone())),
            AttributeValue::Float(v) if v.fract() == 0.0 => Some(FeatureId::Int(*v as i64)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<Option<f64>> for AttributeValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(AttributeValue::Null, AttributeValue::Float)
    }
}

impl From<&FeatureId> for AttributeValue {
    fn from(id: &FeatureId) -> Self {
        match id {
            FeatureId::Int(i) => AttributeValue::Int(*i),
            FeatureId::Str(s) => AttributeValue::String(s.clone()),
        }
    }
}

/// A point feature with attributes
#[derive(Debug, Clone)]
pub struct PointFeature {
    pub id: FeatureId,
    pub location: Point<f64>,
    pub properties: HashMap<String, AttributeValue>,
}

impl PointFeature {
    pub fn new(id: impl Into<FeatureId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            location: Point::new(x, y),
            properties: HashMap::new(),
        }
    }

    pub fn x(&self) -> f64 {
        self.location.x()
    }

    pub fn y(&self) -> f64 {
        self.location.y()
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Read/write access to a layer of point features.
///
/// Fields must be declared with [`PointStore::add_field`] before they can be
/// read or written; touching an undeclared field is a
/// [`Error::SchemaViolation`].
pub trait PointStore {
    /// Layer name used in messages
    fn name(&self) -> &str;

    /// Spatial reference of the coordinates
    fn crs(&self) -> Option<&CRS>;

    /// Number of features
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(id, x, y)` for every feature in storage order
    fn points(&self) -> Box<dyn Iterator<Item = (&FeatureId, f64, f64)> + '_>;

    fn has_field(&self, field: &str) -> bool;

    /// Declare a field; returns `false` if it already existed
    fn add_field(&mut self, field: &str) -> bool;

    /// Raw attribute of a feature (`Null` when never set)
    fn attribute(&self, id: &FeatureId, field: &str) -> Result<AttributeValue>;

    fn set_attribute(&mut self, id: &FeatureId, field: &str, value: AttributeValue) -> Result<()>;

    /// Numeric attribute of a feature, `None` when null
    fn field_value(&self, id: &FeatureId, field: &str) -> Result<Option<f64>> {
        Ok(self.attribute(id, field)?.as_f64())
    }

    /// Write (or clear, with `None`) a numeric attribute
    fn set_field(&mut self, id: &FeatureId, field: &str, value: Option<f64>) -> Result<()> {
        self.set_attribute(id, field, value.into())
    }
}

/// In-memory point layer
#[derive(Debug, Clone, Default)]
pub struct PointCollection {
    name: String,
    crs: Option<CRS>,
    /// Declared fields in creation order
    fields: Vec<String>,
    features: Vec<PointFeature>,
    index: HashMap<FeatureId, usize>,
}

impl PointCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Declared fields in creation order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Add a feature. Its property keys join the schema.
    pub fn push(&mut self, feature: PointFeature) -> Result<()> {
        if self.index.contains_key(&feature.id) {
            return Err(Error::DuplicateFeature(feature.id.to_string()));
        }
        for key in feature.properties.keys() {
            if !self.fields.contains(key) {
                self.fields.push(key.clone());
            }
        }
        self.index.insert(feature.id.clone(), self.features.len());
        self.features.push(feature);
        Ok(())
    }

    pub fn get(&self, id: &FeatureId) -> Option<&PointFeature> {
        self.index.get(id).map(|&i| &self.features[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointFeature> {
        self.features.iter()
    }

    fn feature_mut(&mut self, id: &FeatureId) -> Result<&mut PointFeature> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| Error::UnknownFeature(id.to_string()))?;
        Ok(&mut self.features[i])
    }

    fn check_field(&self, field: &str) -> Result<()> {
        if self.has_field(field) {
            Ok(())
        } else {
            Err(Error::SchemaViolation {
                field: field.to_string(),
                collection: self.name.clone(),
            })
        }
    }
}

impl PointStore for PointCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    fn len(&self) -> usize {
        self.features.len()
    }

    fn points(&self) -> Box<dyn Iterator<Item = (&FeatureId, f64, f64)> + '_> {
        Box::new(self.features.iter().map(|f| (&f.id, f.x(), f.y())))
    }

    fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    fn add_field(&mut self, field: &str) -> bool {
        if self.has_field(field) {
            return false;
        }
        self.fields.push(field.to_string());
        for feature in &mut self.features {
            feature
                .properties
                .entry(field.to_string())
                .or_insert(AttributeValue::Null);
        }
        true
    }

    fn attribute(&self, id: &FeatureId, field: &str) -> Result<AttributeValue> {
        self.check_field(field)?;
        let feature = self
            .get(id)
            .ok_or_else(|| Error::UnknownFeature(id.to_string()))?;
        Ok(feature
            .get_property(field)
            .cloned()
            .unwrap_or(AttributeValue::Null))
    }

    fn set_attribute(&mut self, id: &FeatureId, field: &str, value: AttributeValue) -> Result<()> {
        self.check_field(field)?;
        self.feature_mut(id)?.set_property(field, value);
        Ok(())
    }
}

impl IntoIterator for PointCollection {
    type Item = PointFeature;
    type IntoIter = std::vec::IntoIter<PointFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plots() -> PointCollection {
        let mut layer = PointCollection::new("plots").with_crs(Some(CRS::utm(17, true)));
        let mut a = PointFeature::new(3, 100.0, 200.0);
        a.set_property("name", AttributeValue::String("ridge".into()));
        layer.push(a).unwrap();
        layer.push(PointFeature::new("b7", 150.0, 250.0)).unwrap();
        layer
    }

    #[test]
    fn test_push_rejects_duplicate_ids() {
        let mut layer = plots();
        let err = layer.push(PointFeature::new(3, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, Error::DuplicateFeature(_)));
        assert_eq!(layer.len(), 2);
    }

    #[test]
    fn test_undeclared_field_is_schema_violation() {
        let mut layer = plots();
        let id = FeatureId::Int(3);
        assert!(matches!(
            layer.field_value(&id, "elev"),
            Err(Error::SchemaViolation { .. })
        ));
        assert!(matches!(
            layer.set_field(&id, "elev", Some(1.0)),
            Err(Error::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_add_field_is_idempotent_and_nulls() {
        let mut layer = plots();
        assert!(layer.add_field("elev"));
        assert!(!layer.add_field("elev"));
        assert_eq!(layer.fields(), &["name".to_string(), "elev".to_string()]);

        let id = FeatureId::from("b7");
        assert_eq!(layer.field_value(&id, "elev").unwrap(), None);
        layer.set_field(&id, "elev", Some(812.5)).unwrap();
        assert_eq!(layer.field_value(&id, "elev").unwrap(), Some(812.5));
        layer.set_field(&id, "elev", None).unwrap();
        assert_eq!(layer.field_value(&id, "elev").unwrap(), None);
    }

    #[test]
    fn test_unknown_feature() {
        let mut layer = plots();
        layer.add_field("elev");
        let err = layer.field_value(&FeatureId::Int(99), "elev").unwrap_err();
        assert!(matches!(err, Error::UnknownFeature(_)));
    }

    #[test]
    fn test_attribute_conversions() {
        assert_eq!(AttributeValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(AttributeValue::Float(f64::NAN).as_f64(), None);
        assert_eq!(AttributeValue::String("x".into()).as_f64(), None);
        assert_eq!(AttributeValue::Float(7.0).as_feature_id(), Some(FeatureId::Int(7)));
        assert_eq!(
            AttributeValue::String("b7".into()).as_feature_id(),
            Some(FeatureId::from("b7"))
        );
        assert_eq!(AttributeValue::Float(7.5).as_feature_id(), None);
    }

    #[test]
    fn test_points_iterates_in_storage_order() {
        let layer = plots();
        let ids: Vec<String> = layer.points().map(|(id, _, _)| id.to_string()).collect();
        assert_eq!(ids, vec!["3", "b7"]);
    }
}
