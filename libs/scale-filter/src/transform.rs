//! Value scaling
//!
//! Rewrites numeric datapoints as `value * factor + offset`:
//! - `Float` stays `Float`
//! - `Integer` stays `Integer` when the result is a whole number inside the
//!   `i64` range, otherwise it becomes `Float`
//! - every other value kind is left untouched

use tracing::trace;

use crate::config::ScaleConfig;
use crate::types::{Reading, Value};

/// Linear transformation: processed = raw * factor + offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTransform {
    /// Scale factor
    pub factor: f64,
    /// Constant offset
    pub offset: f64,
}

impl LinearTransform {
    pub fn new(factor: f64, offset: f64) -> Self {
        Self { factor, offset }
    }

    pub fn apply(&self, value: f64) -> f64 {
        value * self.factor + self.offset
    }

    /// Rewrite a datapoint value in place, returns true if it was numeric
    pub fn apply_to(&self, value: &mut Value) -> bool {
        match value {
            Value::Integer(raw) => {
                let scaled = self.apply(*raw as f64);
                *value = integer_or_float(scaled);
                true
            },
            Value::Float(raw) => {
                *raw = self.apply(*raw);
                true
            },
            _ => false,
        }
    }
}

/// Whole numbers that fit `i64` stay integers, anything else is a float
fn integer_or_float(scaled: f64) -> Value {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if scaled.fract() == 0.0 && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64 {
        Value::Integer(scaled as i64)
    } else {
        Value::Float(scaled)
    }
}

/// Counters for one pass over a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScaleStats {
    /// Readings in the batch
    pub readings: usize,
    /// Readings skipped by the asset filter
    pub filtered: usize,
    /// Numeric datapoints rewritten
    pub scaled: usize,
}

/// Apply the configured transform to a batch in place
pub fn scale_readings(readings: &mut [Reading], config: &ScaleConfig) -> ScaleStats {
    let mut stats = ScaleStats {
        readings: readings.len(),
        ..ScaleStats::default()
    };

    if !config.enabled {
        return stats;
    }

    for reading in readings.iter_mut() {
        if !config.matches_asset(&reading.asset_name) {
            stats.filtered += 1;
            trace!("Asset '{}' does not match filter, skipped", reading.asset_name);
            continue;
        }

        for datapoint in reading.datapoints.iter_mut() {
            if config.transform.apply_to(&mut datapoint.value) {
                stats.scaled += 1;
            }
        }
    }

    stats
}
