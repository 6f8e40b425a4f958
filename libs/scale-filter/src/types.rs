//! Reading data model shared with the host pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Datapoint value as delivered by the host
///
/// Only `Integer` and `Float` are rewritten by the filter; every other kind
/// is carried through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Array of floating point samples
    FloatArray(Vec<f64>),
    /// Nested named values
    Dict(BTreeMap<String, Value>),
    /// Null/undefined value
    Null,
}

impl Value {
    /// Short kind name used in logs and diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::FloatArray(_) => "float_array",
            Value::Dict(_) => "dict",
            Value::Null => "null",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// False when a float anywhere in the value is NaN or infinite
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Float(v) => v.is_finite(),
            Value::FloatArray(values) => values.iter().all(|v| v.is_finite()),
            Value::Dict(entries) => entries.values().all(Value::is_finite),
            Value::Integer(_) | Value::String(_) | Value::Null => true,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::FloatArray(v)
    }
}

/// Named value within a reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub name: String,
    pub value: Value,
}

impl Datapoint {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One sensor sample for an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Asset the sample belongs to
    pub asset_name: String,
    /// Sample timestamp as reported by the source, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Ordered datapoints
    #[serde(default)]
    pub datapoints: Vec<Datapoint>,
}

impl Reading {
    pub fn new(asset_name: impl Into<String>, datapoints: Vec<Datapoint>) -> Self {
        Self {
            asset_name: asset_name.into(),
            timestamp: None,
            datapoints,
        }
    }

    /// Reading holding a single datapoint
    pub fn single(asset_name: impl Into<String>, datapoint: Datapoint) -> Self {
        Self::new(asset_name, vec![datapoint])
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn datapoint_count(&self) -> usize {
        self.datapoints.len()
    }

    /// Look up a datapoint by name
    pub fn datapoint(&self, name: &str) -> Option<&Datapoint> {
        self.datapoints.iter().find(|dp| dp.name == name)
    }
}

/// Batch of readings handed over by the host for a single ingest call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingSet {
    readings: Vec<Reading>,
}

impl ReadingSet {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn readings_mut(&mut self) -> &mut [Reading] {
        &mut self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl From<Vec<Reading>> for ReadingSet {
    fn from(readings: Vec<Reading>) -> Self {
        Self::new(readings)
    }
}
