//! Filter configuration
//!
//! Three layers, from host document to the snapshot the transform reads:
//! - [`ConfigCategory`]: host key/value category, items carry `value`/`default`
//! - [`ScaleSettings`]: flat serde view (`enable`, `factor`, `offset`, `match`)
//! - [`ScaleConfig`]: validated immutable snapshot with the compiled asset filter

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

use crate::error::{Result, ScaleError};
use crate::plugin::PluginInformation;
use crate::serde_helpers::{
    deserialize_enable, deserialize_factor, deserialize_offset,
    deserialize_pattern, factor_default, offset_default,
};
use crate::transform::LinearTransform;

// ============================================================================
// ConfigCategory - host configuration document
// ============================================================================

/// Single item of a configuration category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    #[serde(default)]
    pub description: String,

    #[serde(rename = "type", default)]
    pub item_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,

    #[serde(
        rename = "displayName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<String>,
}

impl ConfigItem {
    pub fn new(
        item_type: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            item_type: item_type.into(),
            default: Some(JsonValue::String(default.into())),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order.to_string());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.readonly = Some("true".to_string());
        self
    }

    /// Current value, falling back to the default
    pub fn effective_value(&self) -> Option<&JsonValue> {
        self.value.as_ref().or(self.default.as_ref())
    }
}

/// Named configuration category as sent by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigCategory {
    pub name: String,
    pub items: BTreeMap<String, ConfigItem>,
}

impl ConfigCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: BTreeMap::new(),
        }
    }

    /// Parse a category document: `{ "<item>": { "type": .., "default": .., "value": .. } }`
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let items: BTreeMap<String, ConfigItem> = serde_json::from_str(json)?;
        Ok(Self {
            name: name.into(),
            items,
        })
    }

    /// Category seeded from the plugin's default configuration, every item
    /// value set to its default
    pub fn from_default_config(name: impl Into<String>, info: &PluginInformation) -> Self {
        let items = info
            .config
            .iter()
            .map(|(key, item)| {
                let mut item = item.clone();
                item.value = item.default.clone();
                (key.clone(), item)
            })
            .collect();
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn item_exists(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Effective value of an item (value, else default)
    pub fn value_of(&self, key: &str) -> Option<&JsonValue> {
        self.items.get(key)?.effective_value()
    }

    /// Set the value of an existing item
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let item = self
            .items
            .get_mut(key)
            .ok_or_else(|| ScaleError::invalid_config(key, "no such configuration item"))?;
        item.value = Some(JsonValue::String(value.into()));
        Ok(())
    }

    /// Flat `item -> effective value` map
    pub fn effective_values(&self) -> Map<String, JsonValue> {
        self.items
            .iter()
            .filter_map(|(key, item)| Some((key.clone(), item.effective_value()?.clone())))
            .collect()
    }

    pub fn to_settings(&self) -> Result<ScaleSettings> {
        ScaleSettings::from_map(self.effective_values())
    }
}

// ============================================================================
// ScaleSettings - flat serde view
// ============================================================================

/// Flat filter settings, the shape shared by host documents, settings files
/// and environment overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSettings {
    #[serde(default, deserialize_with = "deserialize_enable")]
    pub enable: bool,

    #[serde(default = "factor_default", deserialize_with = "deserialize_factor")]
    pub factor: f64,

    #[serde(default = "offset_default", deserialize_with = "deserialize_offset")]
    pub offset: f64,

    /// Asset name pattern, empty = every asset
    #[serde(
        rename = "match",
        default,
        deserialize_with = "deserialize_pattern"
    )]
    pub match_pattern: String,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            enable: false,
            factor: factor_default(),
            offset: offset_default(),
            match_pattern: String::new(),
        }
    }
}

impl ScaleSettings {
    fn from_map(map: Map<String, JsonValue>) -> Result<Self> {
        serde_json::from_value(JsonValue::Object(map))
            .map_err(|e| ScaleError::invalid_config("settings", e.to_string()))
    }
}

// ============================================================================
// ScaleConfig - validated snapshot
// ============================================================================

/// Compiled asset name filter, full-match semantics
#[derive(Debug, Clone)]
pub struct AssetFilter {
    pattern: String,
    regex: Regex,
}

impl AssetFilter {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| ScaleError::invalid_pattern(pattern.clone(), e))?;
        Ok(Self { pattern, regex })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when the whole asset name matches the pattern
    pub fn matches(&self, asset_name: &str) -> bool {
        self.regex.is_match(asset_name)
    }
}

/// Immutable configuration snapshot read by every ingest call
#[derive(Debug, Clone)]
pub struct ScaleConfig {
    pub enabled: bool,
    pub transform: LinearTransform,
    pub asset_filter: Option<AssetFilter>,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            transform: LinearTransform::new(factor_default(), offset_default()),
            asset_filter: None,
        }
    }
}

impl ScaleConfig {
    pub fn from_category(category: &ConfigCategory) -> Result<Self> {
        Self::try_from(category.to_settings()?)
    }

    /// Parse either a full category document or a flat settings object
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: JsonValue = serde_json::from_str(json)?;
        let JsonValue::Object(map) = doc else {
            return Err(ScaleError::invalid_config(
                "config",
                "expected a JSON object",
            ));
        };

        let settings = if is_category_document(&map) {
            let items: BTreeMap<String, ConfigItem> =
                serde_json::from_value(JsonValue::Object(map))?;
            ConfigCategory {
                name: String::new(),
                items,
            }
            .to_settings()?
        } else {
            ScaleSettings::from_map(map)?
        };

        Self::try_from(settings)
    }

    /// True when the reading with this asset name should be scaled
    pub fn matches_asset(&self, asset_name: &str) -> bool {
        self.asset_filter
            .as_ref()
            .map_or(true, |filter| filter.matches(asset_name))
    }

    pub fn pattern(&self) -> Option<&str> {
        self.asset_filter.as_ref().map(AssetFilter::pattern)
    }
}

impl TryFrom<ScaleSettings> for ScaleConfig {
    type Error = ScaleError;

    fn try_from(settings: ScaleSettings) -> Result<Self> {
        let asset_filter = if settings.match_pattern.is_empty() {
            None
        } else {
            Some(AssetFilter::new(settings.match_pattern)?)
        };

        Ok(Self {
            enabled: settings.enable,
            transform: LinearTransform::new(settings.factor, settings.offset),
            asset_filter,
        })
    }
}

/// A category document has at least one item object carrying `value` or `default`
fn is_category_document(map: &Map<String, JsonValue>) -> bool {
    map.values().any(|v| {
        v.as_object()
            .is_some_and(|item| item.contains_key("value") || item.contains_key("default"))
    })
}
