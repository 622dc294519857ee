use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped location reading with an accuracy radius. Produced exclusively by a
/// fix provider and never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Radius of uncertainty around the coordinates, in meters. Smaller is better.
    pub accuracy_meters: f64,
    pub recorded_at: DateTime<Utc>,
    pub source: FixSource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSource {
    Gps,
    Network,
    Fused,
    Passive,
}

/// One delivery from an active subscription. Providers may coalesce several fixes into a
/// single callback; the last fix in the batch is the designated most recent one.
#[derive(Clone, Debug, PartialEq)]
pub struct FixBatch {
    fixes: Vec<LocationFix>,
}

impl FixBatch {
    pub fn new(fixes: Vec<LocationFix>) -> Self {
        FixBatch { fixes }
    }

    pub fn single(fix: LocationFix) -> Self {
        FixBatch { fixes: vec![fix] }
    }

    pub fn latest(&self) -> Option<&LocationFix> {
        self.fixes.last()
    }

    pub fn fixes(&self) -> &[LocationFix] {
        &self.fixes
    }
}
