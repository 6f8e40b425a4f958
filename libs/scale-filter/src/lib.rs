//! scale-filter - linear scaling filter for sensor reading pipelines
//!
//! Rewrites numeric datapoint values as `value * factor + offset`, optionally
//! restricted to readings whose asset name matches a regular expression, and
//! forwards the batch downstream.
//!
//! # Example
//!
//! ```rust
//! use scale_filter::{
//!     plugin_info, BufferedOutput, ConfigCategory, Datapoint, Reading, ReadingSet,
//!     ScaleFilter, Value,
//! };
//!
//! let mut category = ConfigCategory::from_default_config("scale", &plugin_info());
//! category.set_value("enable", "true").unwrap();
//! category.set_value("factor", "2").unwrap();
//! category.set_value("offset", "100").unwrap();
//!
//! let mut filter = ScaleFilter::init(&category, BufferedOutput::new()).unwrap();
//! filter.ingest(ReadingSet::from(vec![Reading::new(
//!     "pump",
//!     vec![Datapoint::new("speed", 5.5), Datapoint::new("count", 10)],
//! )]));
//!
//! let out = filter.output_mut().take();
//! let reading = &out[0].readings()[0];
//! assert_eq!(reading.datapoints[0].value, Value::Float(111.0));
//! assert_eq!(reading.datapoints[1].value, Value::Integer(120));
//! filter.shutdown();
//! ```
//!
//! # Configuration
//!
//! | Item | Type | Default | Description |
//! |------|------|---------|-------------|
//! | `enable` | boolean | `false` | Run the filter; a disabled filter forwards batches untouched |
//! | `factor` | float | `100.0` | Multiplier applied to every numeric value |
//! | `offset` | float | `0.0` | Constant added after scaling |
//! | `match` | string | `""` | Regular expression the whole asset name must match, empty = all |

pub mod asset_tracker;
pub mod config;
pub mod error;
pub mod plugin;
pub mod serde_helpers;
pub mod transform;
pub mod types;

// Re-exports for convenience
pub use asset_tracker::{AssetTracker, AssetTrackingTuple, MemoryAssetTracker, FILTER_EVENT};
pub use config::{AssetFilter, ConfigCategory, ConfigItem, ScaleConfig, ScaleSettings};
pub use error::{Result, ScaleError};
pub use plugin::{
    plugin_info, BufferedOutput, OutputStream, PluginInformation, PluginType, ScaleFilter,
    FILTER_NAME, INTERFACE_VERSION,
};
pub use serde_helpers::{DEFAULT_FACTOR, DEFAULT_OFFSET};
pub use transform::{scale_readings, LinearTransform, ScaleStats};
pub use types::{Datapoint, Reading, ReadingSet, Value};
