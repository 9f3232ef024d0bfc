//! Layer elements: individual network features with geometry and versioned field data

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::layer::Layer;

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Read a flat `[lat, lon, lat, lon, ...]` sequence. A dangling trailing value is ignored.
    pub fn from_flat(values: &[f64]) -> Vec<Coordinate> {
        values
            .chunks_exact(2)
            .map(|pair| Coordinate::new(pair[0], pair[1]))
            .collect()
    }

    pub(crate) fn as_array(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// Stable arena slot of an element inside the store.
/// Elements are never physically removed, so a key stays valid until the store is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(pub(crate) usize);

/// Incoming state for an element create-or-update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementUpdate {
    /// Nil asks the store to allocate an id on creation
    pub id: Uuid,
    pub code: String,
    pub activation: bool,
    pub points: Vec<Coordinate>,
    pub field_values_text: String,
    pub version: i64,
}

impl ElementUpdate {
    pub fn new(code: impl Into<String>, version: i64) -> Self {
        Self {
            code: code.into(),
            activation: true,
            version,
            ..Default::default()
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.points = vec![Coordinate::new(latitude, longitude)];
        self
    }

    pub fn with_points(mut self, points: Vec<Coordinate>) -> Self {
        self.points = points;
        self
    }

    pub fn with_fields(mut self, field_values_text: impl Into<String>) -> Self {
        self.field_values_text = field_values_text.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.activation = false;
        self
    }
}

/// A stored element. The owning layer is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerElement {
    pub id: Uuid,
    pub code: String,
    pub layer_id: Uuid,
    pub layer_code: String,
    pub activation: bool,
    pub points: Vec<Coordinate>,
    /// Opaque serialized field payload
    pub field_values_text: String,
    pub version: i64,
    /// Visited flag owned by the external tracer
    pub routed: bool,
    /// Derived from the field payload after every mutation
    pub displayname: String,
}

impl LayerElement {
    /// First-sight state: version 0, empty geometry, active
    pub(crate) fn placeholder(update: &ElementUpdate, layer: &Layer) -> Self {
        let id = if update.id.is_nil() {
            Uuid::new_v4()
        } else {
            update.id
        };
        Self {
            id,
            code: update.code.clone(),
            layer_id: layer.id,
            layer_code: layer.code.clone(),
            activation: true,
            points: Vec::new(),
            field_values_text: String::new(),
            version: 0,
            routed: false,
            displayname: String::new(),
        }
    }

    pub(crate) fn apply(&mut self, update: &ElementUpdate) {
        self.activation = update.activation;
        self.points = update.points.clone();
        self.field_values_text = update.field_values_text.clone();
        self.version = update.version;
    }

    /// Field payload read as a JSON array indexed by field index.
    /// `None` when the payload is empty or not an array.
    pub fn field_values(&self) -> Option<Vec<Value>> {
        match serde_json::from_str::<Value>(&self.field_values_text).ok()? {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn field_value(&self, index: usize) -> Option<Value> {
        self.field_values()?.into_iter().nth(index)
    }
}

/// Interpret a payload value as a numeric domain code
pub fn value_as_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Interpret a payload value as display text
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
