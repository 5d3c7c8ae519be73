//! Pose samples: where the robot was, and when.

use serde::{Deserialize, Serialize};

/// One timestamped sample of the robot's pose along the mission route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseSample {
    /// Milliseconds since the start of the mission video.
    pub timestamp_ms: u64,

    /// Meters from the mission origin, east positive.
    pub x: f64,

    /// Meters from the mission origin, north positive.
    pub y: f64,

    /// Heading in degrees, normalized to `[0, 360)`.
    pub heading_degrees: f64,
}

impl PoseSample {
    /// Returns this sample with the heading wrapped into `[0, 360)`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.heading_degrees = self.heading_degrees.rem_euclid(360.0);
        self
    }
}
