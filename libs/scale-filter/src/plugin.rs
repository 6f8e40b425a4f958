//! Filter plugin lifecycle
//!
//! The host drives a filter through four calls:
//! - `init`: parse the configuration category and build the handle
//! - `ingest`: scale one batch and forward it to the output stream
//! - `reconfigure`: swap in a new configuration snapshot
//! - `shutdown`: release the handle

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::asset_tracker::{AssetTracker, AssetTrackingTuple, FILTER_EVENT};
use crate::config::{ConfigCategory, ConfigItem, ScaleConfig};
use crate::error::Result;
use crate::serde_helpers::{DEFAULT_FACTOR, DEFAULT_OFFSET};
use crate::transform::scale_readings;
use crate::types::ReadingSet;

/// Plugin name, also the default configuration category name
pub const FILTER_NAME: &str = "scale";

/// Host plugin interface version implemented here
pub const INTERFACE_VERSION: &str = "1.0.0";

// ============================================================================
// Plugin information
// ============================================================================

/// Plugin type identifier reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Filter,
}

/// Static description the host reads before calling `init`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInformation {
    pub name: String,
    pub version: String,
    pub flags: u32,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    pub interface_version: String,
    /// Default configuration category
    pub config: BTreeMap<String, ConfigItem>,
}

impl PluginInformation {
    /// Default configuration as the JSON document the host stores
    pub fn default_config_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.config)?)
    }
}

/// Return the information about this plugin
pub fn plugin_info() -> PluginInformation {
    let mut config = BTreeMap::new();
    config.insert(
        "plugin".to_string(),
        ConfigItem::new("string", "Scale filter plugin", FILTER_NAME).read_only(),
    );
    config.insert(
        "enable".to_string(),
        ConfigItem::new(
            "boolean",
            "A switch that can be used to enable or disable execution of the scale filter.",
            "false",
        )
        .with_display_name("Enabled"),
    );
    config.insert(
        "factor".to_string(),
        ConfigItem::new(
            "float",
            "Scale factor for a reading value.",
            format!("{:.1}", DEFAULT_FACTOR),
        )
        .with_order(1)
        .with_display_name("Scale Factor"),
    );
    config.insert(
        "offset".to_string(),
        ConfigItem::new(
            "float",
            "A constant offset to add to every value.",
            format!("{:.1}", DEFAULT_OFFSET),
        )
        .with_order(2)
        .with_display_name("Constant Offset"),
    );
    config.insert(
        "match".to_string(),
        ConfigItem::new(
            "string",
            "An optional regular expression to match in the asset name.",
            "",
        )
        .with_order(3)
        .with_display_name("Asset filter"),
    );

    PluginInformation {
        name: FILTER_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        flags: 0,
        plugin_type: PluginType::Filter,
        interface_version: INTERFACE_VERSION.to_string(),
        config,
    }
}

// ============================================================================
// Output stream
// ============================================================================

/// Downstream hand-off for processed batches
pub trait OutputStream {
    fn forward(&mut self, readings: ReadingSet);
}

impl<F> OutputStream for F
where
    F: FnMut(ReadingSet),
{
    fn forward(&mut self, readings: ReadingSet) {
        self(readings)
    }
}

/// Output stream that keeps forwarded batches in memory
#[derive(Debug, Default)]
pub struct BufferedOutput {
    batches: Vec<ReadingSet>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[ReadingSet] {
        &self.batches
    }

    /// Drain everything forwarded so far
    pub fn take(&mut self) -> Vec<ReadingSet> {
        std::mem::take(&mut self.batches)
    }
}

impl OutputStream for BufferedOutput {
    fn forward(&mut self, readings: ReadingSet) {
        self.batches.push(readings);
    }
}

// ============================================================================
// ScaleFilter - plugin handle
// ============================================================================

/// Handle returned by `init` and passed to every later call
pub struct ScaleFilter<O: OutputStream> {
    category_name: String,
    config: ScaleConfig,
    output: O,
    tracker: Option<Box<dyn AssetTracker>>,
    batches_ingested: u64,
    readings_ingested: u64,
}

impl<O: OutputStream> ScaleFilter<O> {
    /// Validate the configuration category and build the handle
    ///
    /// # Errors
    /// - `InvalidPattern` when `match` is not a valid regular expression
    /// - `InvalidConfig` when `enable`/`factor`/`offset` cannot be parsed
    pub fn init(category: &ConfigCategory, output: O) -> Result<Self> {
        let config = ScaleConfig::from_category(category)?;

        info!(
            "Scale filter '{}' initialized: enabled={}, factor={}, offset={}, match={:?}",
            category.name,
            config.enabled,
            config.transform.factor,
            config.transform.offset,
            config.pattern()
        );

        Ok(Self {
            category_name: category.name.clone(),
            config,
            output,
            tracker: None,
            batches_ingested: 0,
            readings_ingested: 0,
        })
    }

    /// Report asset tracking tuples to `tracker` on every ingest
    pub fn with_asset_tracker(mut self, tracker: impl AssetTracker + 'static) -> Self {
        self.tracker = Some(Box::new(tracker));
        self
    }

    /// Active configuration snapshot
    pub fn config(&self) -> &ScaleConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Scale a batch in place and forward it downstream
    ///
    /// A disabled filter forwards the batch untouched.
    pub fn ingest(&mut self, mut readings: ReadingSet) {
        self.batches_ingested += 1;
        self.readings_ingested += readings.len() as u64;

        if !self.config.enabled {
            self.output.forward(readings);
            return;
        }

        if let Some(tracker) = &self.tracker {
            for reading in readings.readings() {
                tracker.add_tuple(AssetTrackingTuple::new(
                    self.category_name.as_str(),
                    reading.asset_name.as_str(),
                    FILTER_EVENT,
                ));
            }
        }

        let stats = scale_readings(readings.readings_mut(), &self.config);
        debug!(
            "Scaled batch: readings={}, filtered={}, datapoints={}",
            stats.readings, stats.filtered, stats.scaled
        );

        self.output.forward(readings);
    }

    /// Replace the active configuration with a new document
    ///
    /// Accepts a full category document or flat settings. On error the
    /// previous configuration stays active.
    pub fn reconfigure(&mut self, new_config: &str) -> Result<()> {
        match ScaleConfig::from_json(new_config) {
            Ok(config) => {
                info!(
                    "Scale filter '{}' reconfigured: enabled={}, factor={}, offset={}, match={:?}",
                    self.category_name,
                    config.enabled,
                    config.transform.factor,
                    config.transform.offset,
                    config.pattern()
                );
                self.config = config;
                Ok(())
            },
            Err(e) => {
                warn!(
                    "Scale filter '{}' rejected new configuration, keeping current: {}",
                    self.category_name, e
                );
                Err(e)
            },
        }
    }

    /// Release the handle
    pub fn shutdown(self) {
        info!(
            "Scale filter '{}' shut down after {} batches ({} readings)",
            self.category_name, self.batches_ingested, self.readings_ingested
        );
    }
}
