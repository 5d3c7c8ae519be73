//! Mission orchestration.
//!
//! A single coordinating flow drives a bounded pool of concurrent
//! recognition calls, then feeds the results into the aggregator in
//! frame order: per-frame tasks are awaited in the order their frames
//! were sampled, so aggregation stays deterministic even when calls
//! complete out of order. A mission deadline stops new recognition calls
//! and degrades to a partial report; only failing to write artifacts is
//! fatal here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::aggregate::{LandmarkAggregator, MergeConfig};
use crate::map;
use crate::model::{Frame, Mission};
use crate::observe::LandmarkObserver;
use crate::oracle::SummaryOracle;
use crate::pose::PoseTrack;
use crate::report::{self, WriteError};

/// Pipeline tuning.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Maximum in-flight recognition calls.
    pub concurrency: usize,

    /// Merge policy tuning, handed to the aggregator.
    pub merge: MergeConfig,

    /// Mission deadline. When it elapses, no further recognition calls
    /// are issued and a partial report is assembled.
    pub deadline: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            merge: MergeConfig::default(),
            deadline: None,
        }
    }
}

/// Run one mission end to end and write its report.
///
/// Returns the report path. A report is always attempted: degraded
/// inputs shrink its content, they do not abort it.
pub async fn run_mission(
    mission: &Mission,
    frames: impl Iterator<Item = Frame>,
    poses: &PoseTrack,
    observer: &LandmarkObserver,
    summarizer: Option<Arc<dyn SummaryOracle>>,
    options: &PipelineOptions,
) -> Result<PathBuf, WriteError> {
    let deadline = options.deadline.map(|d| Instant::now() + d);
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));

    // Fan out: one task per sampled frame, bounded by the semaphore.
    // Acquiring before pulling the next frame also bounds how many
    // decoded frames sit in memory.
    let mut handles = Vec::new();
    let mut sampled = 0_usize;
    for frame in frames {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(
                frames_issued = sampled,
                "mission deadline reached; assembling a partial report"
            );
            break;
        }
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        sampled += 1;
        let observer = observer.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            observer.observe(&frame).await
        }));
    }

    // Join in frame order; the aggregator is single-threaded by design.
    let mut aggregator = LandmarkAggregator::new(options.merge);
    for handle in handles {
        match handle.await {
            Ok(observations) => {
                for observation in observations {
                    aggregator.ingest(observation);
                }
            }
            Err(e) => warn!("recognition task failed to complete: {e}"),
        }
    }

    let entities = aggregator.finalize(poses);
    info!(
        frames = sampled,
        entities = entities.len(),
        "aggregation complete"
    );

    let narrative = match (&summarizer, entities.is_empty()) {
        (Some(oracle), false) => match oracle.summarize(&entities).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("narrative summary unavailable: {e}");
                None
            }
        },
        _ => None,
    };

    let map_image = map::render(poses, &entities);
    let report = report::assemble(mission, entities, narrative);
    report::write(mission, &report, &map_image)
}
