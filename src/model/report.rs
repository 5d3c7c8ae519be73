//! Mission and report roots.

use std::path::PathBuf;

use super::LandmarkEntity;

/// One report-generation run: the root from which everything else is
/// reachable.
#[derive(Debug, Clone)]
pub struct Mission {
    /// Caller-supplied identifier, unique per run, immutable once assigned.
    pub id: String,

    /// Directory under which all artifacts are written.
    pub output_root: PathBuf,
}

/// The final output document, created once after aggregation completes.
#[derive(Debug)]
pub struct MissionReport {
    pub mission_id: String,

    /// Narrative summary, or a placeholder when the collaborator is absent.
    pub summary: String,

    /// Landmark entities in ascending id order.
    pub landmarks: Vec<LandmarkEntity>,
}
