//! Landmark aggregation: merging repeated sightings of one physical
//! object into a single entity.
//!
//! The aggregator is strictly single-threaded and must receive
//! observations in non-decreasing frame-timestamp order; merge decisions
//! depend on every prior entity, and processing in frame order is what
//! keeps entity creation deterministic. Entity ids are allocated
//! monotonically and never reused.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::model::{EntityId, LandmarkEntity, LandmarkObservation, UNKNOWN};
use crate::pose::PoseTrack;

/// Tuning for the merge policy.
#[derive(Debug, Clone, Copy)]
pub struct MergeConfig {
    /// Observations further apart than this from an entity's latest
    /// sighting can never merge into it.
    pub window_ms: u64,

    /// Minimum description similarity (token-overlap Jaccard, 0..=1)
    /// required to merge.
    pub similarity_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            // Three sampling intervals at the default 1 Hz rate.
            window_ms: 3000,
            similarity_threshold: 0.5,
        }
    }
}

/// A growing entity: all contributing observations, in arrival order.
struct EntityDraft {
    id: EntityId,
    observations: Vec<LandmarkObservation>,
}

impl EntityDraft {
    /// Timestamp of the most recent contributing observation.
    fn latest_timestamp_ms(&self) -> u64 {
        self.observations.last().map_or(0, |o| o.timestamp_ms)
    }

    /// The richest observation so far; first one wins ties.
    fn representative(&self) -> &LandmarkObservation {
        let mut best = &self.observations[0];
        for obs in &self.observations[1..] {
            if obs.richness() > best.richness() {
                best = obs;
            }
        }
        best
    }
}

/// Deduplicates the per-frame observation stream into distinct entities.
///
/// Owns its id counter and entity set explicitly; there is no shared
/// mutable pipeline state.
pub struct LandmarkAggregator {
    config: MergeConfig,
    drafts: Vec<EntityDraft>,
    next_id: EntityId,
}

impl LandmarkAggregator {
    #[must_use]
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            drafts: Vec::new(),
            next_id: EntityId::first(),
        }
    }

    /// Fold one observation into the entity set.
    ///
    /// Merges into the best-scoring existing entity above the threshold
    /// (ties break to the earliest-created entity, which comes first in
    /// the scan); otherwise creates a new entity with a fresh id.
    /// Malformed observations are dropped with a warning.
    pub fn ingest(&mut self, observation: LandmarkObservation) {
        if observation.category == UNKNOWN && observation.description == UNKNOWN {
            warn!(
                timestamp_ms = observation.timestamp_ms,
                "dropping observation with no identifying content"
            );
            return;
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, draft) in self.drafts.iter().enumerate() {
            let Some(score) = self.merge_score(draft, &observation) else {
                continue;
            };
            // Strict greater-than keeps the earliest entity on ties.
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        match best {
            Some((index, score)) => {
                debug!(
                    entity = %self.drafts[index].id,
                    score,
                    timestamp_ms = observation.timestamp_ms,
                    "merged observation into existing entity"
                );
                self.drafts[index].observations.push(observation);
            }
            None => {
                let id = self.next_id;
                self.next_id = self.next_id.next();
                debug!(
                    entity = %id,
                    timestamp_ms = observation.timestamp_ms,
                    "created new entity"
                );
                self.drafts.push(EntityDraft {
                    id,
                    observations: vec![observation],
                });
            }
        }
    }

    /// Score a candidate merge, or `None` when the gates fail.
    ///
    /// Gates: category equality (case-insensitive) and temporal proximity
    /// to the entity's latest sighting. The score itself is description
    /// similarity against the entity's current representative, and must
    /// clear the configured threshold.
    fn merge_score(&self, draft: &EntityDraft, observation: &LandmarkObservation) -> Option<f64> {
        let representative = draft.representative();
        if !representative
            .category
            .eq_ignore_ascii_case(&observation.category)
        {
            return None;
        }

        let gap = observation
            .timestamp_ms
            .abs_diff(draft.latest_timestamp_ms());
        if gap > self.config.window_ms {
            return None;
        }

        let score = token_similarity(&representative.description, &observation.description);
        (score >= self.config.similarity_threshold).then_some(score)
    }

    /// Number of entities created so far.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.drafts.len()
    }

    /// Freeze the entity set: pick representatives, collect contributing
    /// timestamps, and resolve each pose against the track.
    ///
    /// Entities come back in ascending id order.
    #[must_use]
    pub fn finalize(self, poses: &PoseTrack) -> Vec<LandmarkEntity> {
        self.drafts
            .into_iter()
            .map(|draft| {
                let representative = draft.representative().clone();
                let observed_timestamps_ms: Vec<u64> =
                    draft.observations.iter().map(|o| o.timestamp_ms).collect();
                let pose = poses.lookup(representative.timestamp_ms);
                LandmarkEntity {
                    id: draft.id,
                    representative,
                    observed_timestamps_ms,
                    pose,
                }
            })
            .collect()
    }
}

/// Token-overlap Jaccard similarity over lowercased alphanumeric tokens.
///
/// Two unknown or empty descriptions count as identical: when the only
/// signal is the category, repeated same-category sightings within the
/// window should still merge.
#[must_use]
pub fn token_similarity(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        {
            intersection as f64 / union as f64
        }
    }
}

fn tokens(text: &str) -> HashSet<String> {
    if text == UNKNOWN {
        return HashSet::new();
    }
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{ContextualAnalysis, PoseSample};

    fn observation(timestamp_ms: u64, category: &str, description: &str) -> LandmarkObservation {
        LandmarkObservation {
            timestamp_ms,
            category: category.to_string(),
            description: description.to_string(),
            analysis: ContextualAnalysis::unknown(),
            jpeg: Vec::new(),
        }
    }

    fn aggregator() -> LandmarkAggregator {
        LandmarkAggregator::new(MergeConfig::default())
    }

    #[test]
    fn near_identical_sightings_merge_into_one_entity() {
        // Scenario: frames 3, 4, 5 all show the same cat-like figure.
        let mut agg = aggregator();
        agg.ingest(observation(3000, "cat figure", "small cat-shaped figure on a rock"));
        agg.ingest(observation(4000, "cat figure", "small cat-shaped figure sitting on a rock"));
        agg.ingest(observation(5000, "cat figure", "cat-shaped figure on a rock"));

        assert_eq!(agg.entity_count(), 1);
        let entities = agg.finalize(&PoseTrack::empty());
        assert_eq!(entities[0].observed_timestamps_ms, vec![3000, 4000, 5000]);
    }

    #[test]
    fn different_categories_never_merge() {
        let mut agg = aggregator();
        agg.ingest(observation(3000, "cat figure", "figure on a rock"));
        agg.ingest(observation(3500, "deer figure", "figure on a rock"));

        assert_eq!(agg.entity_count(), 2);
    }

    #[test]
    fn category_match_is_case_insensitive() {
        let mut agg = aggregator();
        agg.ingest(observation(0, "Supply Crate", "red crate"));
        agg.ingest(observation(1000, "supply crate", "red crate"));
        assert_eq!(agg.entity_count(), 1);
    }

    #[test]
    fn sightings_outside_the_window_form_a_new_entity() {
        let mut agg = aggregator();
        agg.ingest(observation(0, "crate", "red crate"));
        agg.ingest(observation(10_000, "crate", "red crate"));

        assert_eq!(agg.entity_count(), 2);
    }

    #[test]
    fn dissimilar_descriptions_do_not_merge() {
        let mut agg = aggregator();
        agg.ingest(observation(0, "debris", "twisted strip of silver foil"));
        agg.ingest(observation(1000, "debris", "large black rubber wheel"));

        assert_eq!(agg.entity_count(), 2);
    }

    #[test]
    fn ids_are_unique_and_ascending() {
        let mut agg = aggregator();
        agg.ingest(observation(0, "a", "first thing"));
        agg.ingest(observation(100, "b", "second thing"));
        agg.ingest(observation(200, "c", "third thing"));

        let entities = agg.finalize(&PoseTrack::empty());
        let ids: Vec<EntityId> = entities.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn representative_is_the_richest_observation() {
        let mut agg = aggregator();
        agg.ingest(observation(0, "crate", "red crate"));
        agg.ingest(observation(1000, "crate", "red crate dented"));
        agg.ingest(observation(
            2000,
            "crate",
            "red crate dented with stenciled markings",
        ));

        let entities = agg.finalize(&PoseTrack::empty());
        assert_eq!(entities.len(), 1);
        assert!(entities[0].representative.description.contains("stenciled"));
    }

    #[test]
    fn pose_resolves_at_the_representative_timestamp() {
        let track = PoseTrack::from_samples(vec![
            PoseSample {
                timestamp_ms: 0,
                x: 0.0,
                y: 0.0,
                heading_degrees: 0.0,
            },
            PoseSample {
                timestamp_ms: 2000,
                x: 2.0,
                y: 0.3,
                heading_degrees: 10.0,
            },
        ])
        .unwrap();

        let mut agg = aggregator();
        agg.ingest(observation(1900, "crate", "red crate"));
        let entities = agg.finalize(&track);
        assert_eq!(entities[0].pose.unwrap().x, 2.0);
    }

    #[test]
    fn no_track_leaves_pose_unresolved() {
        let mut agg = aggregator();
        agg.ingest(observation(0, "crate", "red crate"));
        let entities = agg.finalize(&PoseTrack::empty());
        assert!(entities[0].pose.is_none());
    }

    #[test]
    fn observations_with_no_content_are_dropped() {
        let mut agg = aggregator();
        agg.ingest(observation(0, UNKNOWN, UNKNOWN));
        assert_eq!(agg.entity_count(), 0);
    }

    #[test]
    fn unknown_descriptions_with_matching_categories_merge() {
        let mut agg = aggregator();
        agg.ingest(observation(0, "crate", UNKNOWN));
        agg.ingest(observation(1000, "crate", UNKNOWN));
        assert_eq!(agg.entity_count(), 1);
    }

    #[test]
    fn token_similarity_basics() {
        assert_eq!(token_similarity("red crate", "red crate"), 1.0);
        assert_eq!(token_similarity("red crate", "blue wheel"), 0.0);
        let partial = token_similarity("red metal crate", "red crate");
        assert!(partial > 0.5 && partial < 1.0);
        assert_eq!(token_similarity(UNKNOWN, UNKNOWN), 1.0);
    }
}
