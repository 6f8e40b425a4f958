//! Asset tracking
//!
//! The host keeps a record of which service touched which asset. The filter
//! reports one tuple per reading it sees; deduplication is the tracker's job.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Event name reported by filter plugins
pub const FILTER_EVENT: &str = "Filter";

/// `(service, asset, event)` record sent to the host tracker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetTrackingTuple {
    pub service: String,
    pub asset: String,
    pub event: String,
}

impl AssetTrackingTuple {
    pub fn new(
        service: impl Into<String>,
        asset: impl Into<String>,
        event: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            asset: asset.into(),
            event: event.into(),
        }
    }
}

impl fmt::Display for AssetTrackingTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.service, self.asset, self.event)
    }
}

/// Host-side asset tracker
pub trait AssetTracker: Send + Sync {
    /// Record that `tuple.service` handled `tuple.asset`
    fn add_tuple(&self, tuple: AssetTrackingTuple);
}

impl<T: AssetTracker + ?Sized> AssetTracker for Arc<T> {
    fn add_tuple(&self, tuple: AssetTrackingTuple) {
        (**self).add_tuple(tuple)
    }
}

/// In-memory tracker that keeps each distinct tuple once
#[derive(Default)]
pub struct MemoryAssetTracker {
    tuples: Mutex<HashSet<AssetTrackingTuple>>,
}

impl MemoryAssetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tuple: &AssetTrackingTuple) -> bool {
        self.tuples.lock().contains(tuple)
    }

    pub fn len(&self) -> usize {
        self.tuples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.lock().is_empty()
    }

    /// Recorded tuples, sorted
    pub fn tuples(&self) -> Vec<AssetTrackingTuple> {
        let mut tuples: Vec<_> = self.tuples.lock().iter().cloned().collect();
        tuples.sort();
        tuples
    }
}

impl AssetTracker for MemoryAssetTracker {
    fn add_tuple(&self, tuple: AssetTrackingTuple) {
        self.tuples.lock().insert(tuple);
    }
}
