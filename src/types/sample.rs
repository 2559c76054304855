//! Accepted gaze samples

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One accepted gaze observation in screen space
///
/// Created by the recorder at acceptance time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    /// Source-reported confidence, 0 to 100
    pub accuracy: f64,
    /// RFC 3339 with millisecond precision, UTC
    pub timestamp: String,
}

impl GazeSample {
    /// Create a sample stamped with the current time
    pub fn new(x: f64, y: f64, accuracy: f64) -> Self {
        Self {
            x,
            y,
            accuracy,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}
