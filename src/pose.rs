//! Pose track: the robot's trajectory log and nearest-in-time lookup.
//!
//! The track is loaded once from a JSON array of pose records and shared
//! read-only by the aggregator and the map renderer. When no trajectory
//! was supplied, lookups return `None` rather than failing; downstream
//! consumers treat pose as optional.

use std::fs;
use std::io;
use std::path::Path;

use crate::model::PoseSample;

/// Errors from loading a pose file.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("failed to read pose file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid pose JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pose timestamps not sorted: {previous}ms followed by {current}ms")]
    Unsorted { previous: u64, current: u64 },
}

/// The ordered sequence of robot poses over one mission.
#[derive(Debug, Clone, Default)]
pub struct PoseTrack {
    samples: Vec<PoseSample>,
}

impl PoseTrack {
    /// A track with no samples: every lookup returns `None`.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a track from a JSON array of pose records.
    ///
    /// Fails with [`FormatError`] if the file is unreadable, malformed,
    /// or its timestamps are not non-decreasing. Headings are normalized
    /// into `[0, 360)` on load.
    pub fn load(path: &Path) -> Result<Self, FormatError> {
        let contents = fs::read_to_string(path).map_err(|source| FormatError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        let samples: Vec<PoseSample> = serde_json::from_str(&contents)?;
        Self::from_samples(samples)
    }

    /// Build a track from in-memory samples, validating order.
    pub fn from_samples(samples: Vec<PoseSample>) -> Result<Self, FormatError> {
        for pair in samples.windows(2) {
            if pair[1].timestamp_ms < pair[0].timestamp_ms {
                return Err(FormatError::Unsorted {
                    previous: pair[0].timestamp_ms,
                    current: pair[1].timestamp_ms,
                });
            }
        }
        let samples = samples.into_iter().map(PoseSample::normalized).collect();
        Ok(Self { samples })
    }

    /// The pose whose timestamp is closest to the query.
    ///
    /// Equidistant neighbors resolve to the earlier sample, keeping the
    /// lookup deterministic. Returns `None` on an empty track.
    #[must_use]
    pub fn lookup(&self, timestamp_ms: u64) -> Option<PoseSample> {
        self.samples
            .iter()
            .min_by_key(|pose| pose.timestamp_ms.abs_diff(timestamp_ms))
            .copied()
    }

    #[must_use]
    pub fn samples(&self) -> &[PoseSample] {
        &self.samples
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
