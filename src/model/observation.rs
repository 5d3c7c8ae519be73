//! Raw landmark observations: one detection in one frame.

/// Marker for fields the recognition collaborator did not supply.
///
/// Every observation field is backfilled with this so report rendering
/// never has to special-case absent data.
pub const UNKNOWN: &str = "unknown";

/// Contextual analysis of an observed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextualAnalysis {
    /// Probable origin: natural terrain, a prior mission, or anomalous.
    pub origin: String,

    /// Potential utility to the current or future missions.
    pub utility: String,

    /// How significant the finding is.
    pub relevance: String,

    /// Hazards or special considerations.
    pub hazard: String,
}

impl ContextualAnalysis {
    /// An analysis with every field marked unknown.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            origin: UNKNOWN.to_string(),
            utility: UNKNOWN.to_string(),
            relevance: UNKNOWN.to_string(),
            hazard: UNKNOWN.to_string(),
        }
    }
}

/// One raw detection from one frame, before deduplication.
///
/// Always tied to exactly one frame. Created per-frame and consumed
/// immediately by the aggregator.
#[derive(Debug, Clone)]
pub struct LandmarkObservation {
    /// Timestamp of the source frame, ms into the mission video.
    pub timestamp_ms: u64,

    /// Category label, e.g. "heat shield fragment".
    pub category: String,

    /// Free-text visual description.
    pub description: String,

    /// Contextual analysis subfields.
    pub analysis: ContextualAnalysis,

    /// JPEG of the frame this object was seen in.
    pub jpeg: Vec<u8>,
}

impl LandmarkObservation {
    /// How much descriptive content this observation carries.
    ///
    /// Unknown fields count as empty, so a fully populated observation
    /// always outranks a backfilled one when picking a representative.
    #[must_use]
    pub fn richness(&self) -> usize {
        let len = |s: &str| if s == UNKNOWN { 0 } else { s.len() };
        len(&self.description)
            + len(&self.analysis.origin)
            + len(&self.analysis.utility)
            + len(&self.analysis.relevance)
            + len(&self.analysis.hazard)
    }
}
