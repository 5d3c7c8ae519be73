//! Merged landmark entities: one physical object, many sightings.

use std::fmt;

use super::{LandmarkObservation, PoseSample};

/// Monotonic entity identifier, unique within one mission.
///
/// Assigned once at creation and never reused or mutated. Renders as
/// `LM-007` in reports and on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u32);

impl EntityId {
    /// The first id handed out in a mission.
    #[must_use]
    pub fn first() -> Self {
        Self(1)
    }

    /// The id that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The raw ordinal, used for map labels.
    #[must_use]
    pub fn ordinal(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LM-{:03}", self.0)
    }
}

/// A deduplicated, report-worthy landmark merged from one or more
/// observations.
///
/// Immutable once the full frame sequence has been consumed; the
/// aggregator is the only place these are built.
#[derive(Debug, Clone)]
pub struct LandmarkEntity {
    pub id: EntityId,

    /// The richest observation among the merged set; what the report shows.
    pub representative: LandmarkObservation,

    /// Frame timestamps of every contributing observation, ascending.
    pub observed_timestamps_ms: Vec<u64>,

    /// Robot pose nearest the representative sighting, when a track exists.
    pub pose: Option<PoseSample>,
}
