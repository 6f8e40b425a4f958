//! Serde defaults and deserializers for filter settings
//!
//! Host configuration categories carry every item value as a string
//! (`"true"`, `"2"`, `"100.0"`). These deserializers accept those strings as
//! well as native JSON/TOML/YAML scalars:
//! - `"true"`/`"false"` (any case) or a boolean → bool, `""` → false
//! - `"2.5"` or `2.5` → f64, `""` → the field default
//! - match patterns: string, number or boolean → string, `null` → `""`

use serde::{Deserialize, Deserializer};

/// Default scale factor: 100.0
pub const DEFAULT_FACTOR: f64 = 100.0;

/// Default constant offset: 0.0
pub const DEFAULT_OFFSET: f64 = 0.0;

pub fn factor_default() -> f64 {
    DEFAULT_FACTOR
}

pub fn offset_default() -> f64 {
    DEFAULT_OFFSET
}

/// The `enable` item: native bool or `"true"`/`"false"`
pub fn deserialize_enable<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::String(s) => {
            let t = s.trim();
            if t.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if t.is_empty() || t.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(D::Error::custom(format!(
                    "Invalid enable value '{}', expected \"true\" or \"false\"",
                    s
                )))
            }
        },
    }
}

/// f64 from native number or string, empty string → `default`
fn deserialize_f64_or<'de, D>(deserializer: D, default: f64) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        Float(f64),
        String(String),
    }

    match StringOrFloat::deserialize(deserializer)? {
        StringOrFloat::Float(f) => Ok(f),
        StringOrFloat::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                Ok(default)
            } else {
                t.parse::<f64>().map_err(|_| {
                    D::Error::custom(format!("Invalid number '{}', expected a float", s))
                })
            }
        },
    }
}

/// Deserialize the scale factor, empty string → 100.0
pub fn deserialize_factor<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_f64_or(deserializer, DEFAULT_FACTOR)
}

/// Deserialize the offset, empty string → 0.0
pub fn deserialize_offset<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_f64_or(deserializer, DEFAULT_OFFSET)
}

/// Match pattern as a string
///
/// Layered settings sources may hand over `123` or `true` for a pattern that
/// only looks like a scalar; those are kept in their textual form.
pub fn deserialize_pattern<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::String(s)) => s,
        Some(Scalar::Int(i)) => i.to_string(),
        Some(Scalar::Float(f)) => f.to_string(),
        Some(Scalar::Bool(b)) => b.to_string(),
        None => String::new(),
    })
}
