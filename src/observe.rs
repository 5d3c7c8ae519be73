//! Per-frame landmark observation.
//!
//! Wraps the recognition collaborator with a bounded retry policy and
//! normalizes its heterogeneous responses into canonical
//! [`LandmarkObservation`] records. A collaborator failure for one frame
//! degrades to zero observations and a warning; one bad frame never
//! aborts the mission.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::model::{ContextualAnalysis, Frame, LandmarkObservation, UNKNOWN};
use crate::oracle::{Detection, OracleError, RecognitionOracle};

/// Bounded exponential backoff for collaborator calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,

    /// Delay before the second attempt; doubles each retry.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

/// Turns frames into observations via the recognition collaborator.
#[derive(Clone)]
pub struct LandmarkObserver {
    oracle: Arc<dyn RecognitionOracle>,
    retry: RetryPolicy,
}

impl LandmarkObserver {
    pub fn new(oracle: Arc<dyn RecognitionOracle>, retry: RetryPolicy) -> Self {
        Self { oracle, retry }
    }

    /// Observe one frame: zero or more normalized observations.
    ///
    /// Never fails; exhausted retries degrade to an empty list.
    pub async fn observe(&self, frame: &Frame) -> Vec<LandmarkObservation> {
        match self.classify_with_retry(&frame.jpeg).await {
            Ok(detections) => {
                debug!(
                    timestamp_ms = frame.timestamp_ms,
                    count = detections.len(),
                    "frame classified"
                );
                detections
                    .into_iter()
                    .filter_map(|d| normalize(frame, d))
                    .collect()
            }
            Err(e) => {
                warn!(
                    timestamp_ms = frame.timestamp_ms,
                    "recognition failed after {} attempts: {e}", self.retry.attempts
                );
                Vec::new()
            }
        }
    }

    async fn classify_with_retry(&self, jpeg: &[u8]) -> Result<Vec<Detection>, OracleError> {
        let attempts = self.retry.attempts.max(1);
        let mut backoff = self.retry.base_backoff;
        let mut attempt = 1;

        loop {
            match self.oracle.classify(jpeg).await {
                Ok(detections) => return Ok(detections),
                Err(e) if attempt < attempts => {
                    debug!(attempt, "recognition attempt failed, retrying: {e}");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Normalize one detection into an observation tied to its frame.
///
/// Absent fields become the explicit unknown marker. A detection with
/// neither category nor description is malformed and dropped.
fn normalize(frame: &Frame, detection: Detection) -> Option<LandmarkObservation> {
    let filled = |value: Option<String>| {
        value
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    let category = filled(detection.category);
    let description = filled(detection.description);
    if category == UNKNOWN && description == UNKNOWN {
        warn!(
            timestamp_ms = frame.timestamp_ms,
            "dropping malformed detection with no category or description"
        );
        return None;
    }

    Some(LandmarkObservation {
        timestamp_ms: frame.timestamp_ms,
        category,
        description,
        analysis: ContextualAnalysis {
            origin: filled(detection.origin),
            utility: filled(detection.utility),
            relevance: filled(detection.relevance),
            hazard: filled(detection.hazard),
        },
        jpeg: frame.jpeg.clone(),
    })
}
