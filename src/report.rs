//! Report assembly and artifact persistence.
//!
//! Produces the Markdown mission report plus its supporting images under
//! a deterministic layout:
//!
//! ```text
//! <output_root>/<mission_id>/
//!   reports/report.md
//!   map_images/map_<mission_id>.png
//!   landmark_images/<mission_id>_<entity_id>.jpg
//! ```
//!
//! Writing is idempotent: identical inputs and mission id overwrite the
//! same paths byte-for-byte. No wall-clock state leaks into content.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

use image::RgbImage;
use tracing::info;

use crate::model::{LandmarkEntity, Mission, MissionReport};

/// Placeholder when the narrative collaborator produced nothing.
const SUMMARY_UNAVAILABLE: &str = "Narrative summary unavailable.";

/// Summary for a mission with no surviving entities.
const NO_LANDMARKS: &str = "No landmarks detected due to data unavailability.";

/// Errors writing report artifacts. Fatal: without a writable output
/// root there is no report to produce.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode map image: {0}")]
    Image(#[from] image::ImageError),
}

/// Assemble the write-once report document.
///
/// Entities must already be in ascending id order (the aggregator
/// guarantees this). A missing narrative degrades to a placeholder.
#[must_use]
pub fn assemble(
    mission: &Mission,
    landmarks: Vec<LandmarkEntity>,
    narrative: Option<String>,
) -> MissionReport {
    let summary = if landmarks.is_empty() {
        NO_LANDMARKS.to_string()
    } else {
        narrative
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| SUMMARY_UNAVAILABLE.to_string())
    };

    MissionReport {
        mission_id: mission.id.clone(),
        summary,
        landmarks,
    }
}

/// Write the report and all supporting images. Returns the report path.
pub fn write(
    mission: &Mission,
    report: &MissionReport,
    map: &RgbImage,
) -> Result<PathBuf, WriteError> {
    let mission_dir = mission.output_root.join(&mission.id);
    let reports_dir = mission_dir.join("reports");
    let map_dir = mission_dir.join("map_images");
    let landmark_dir = mission_dir.join("landmark_images");
    for dir in [&reports_dir, &map_dir, &landmark_dir] {
        fs::create_dir_all(dir).map_err(|source| WriteError::Io {
            path: dir.display().to_string(),
            source,
        })?;
    }

    let map_path = map_dir.join(map_filename(&report.mission_id));
    map.save(&map_path)?;

    for entity in &report.landmarks {
        let image_path = landmark_dir.join(landmark_filename(&report.mission_id, entity));
        fs::write(&image_path, &entity.representative.jpeg).map_err(|source| WriteError::Io {
            path: image_path.display().to_string(),
            source,
        })?;
    }

    let report_path = reports_dir.join("report.md");
    fs::write(&report_path, render_markdown(report)).map_err(|source| WriteError::Io {
        path: report_path.display().to_string(),
        source,
    })?;

    info!(
        mission_id = %report.mission_id,
        landmarks = report.landmarks.len(),
        path = %report_path.display(),
        "report written"
    );
    Ok(report_path)
}

fn map_filename(mission_id: &str) -> String {
    format!("map_{mission_id}.png")
}

fn landmark_filename(mission_id: &str, entity: &LandmarkEntity) -> String {
    format!("{mission_id}_{}.jpg", entity.id)
}

/// Render the full report document.
///
/// Image links are relative to the reports directory, mirroring the
/// on-disk layout.
#[must_use]
pub fn render_markdown(report: &MissionReport) -> String {
    let mut doc = String::new();

    let _ = writeln!(doc, "# Mission Report: {}", report.mission_id);
    doc.push_str("\n## General Findings\n\n");
    let _ = writeln!(
        doc,
        "- **Distinct landmarks found:** {}",
        report.landmarks.len()
    );
    let _ = writeln!(doc, "- **Mission summary:** {}", report.summary);

    doc.push_str("\n### Mission Map\n\n");
    let _ = writeln!(
        doc,
        "![Mission map](../map_images/{})",
        map_filename(&report.mission_id)
    );

    doc.push_str("\n---\n");

    if report.landmarks.is_empty() {
        doc.push_str("\n**No landmarks were confirmed in this mission.**\n");
    }

    for entity in &report.landmarks {
        let _ = writeln!(doc, "\n## Landmark {}\n", entity.id);
        let _ = writeln!(
            doc,
            "![Landmark {}](../landmark_images/{})\n",
            entity.id,
            landmark_filename(&report.mission_id, entity)
        );
        let _ = writeln!(doc, "- **Category:** {}", entity.representative.category);
        let _ = writeln!(
            doc,
            "- **Visual description:** {}",
            entity.representative.description
        );
        doc.push_str("- **Contextual analysis:**\n");
        let analysis = &entity.representative.analysis;
        let _ = writeln!(doc, "  - Probable origin: {}", analysis.origin);
        let _ = writeln!(doc, "  - Potential utility: {}", analysis.utility);
        let _ = writeln!(doc, "  - Relevance: {}", analysis.relevance);
        let _ = writeln!(doc, "  - Hazards: {}", analysis.hazard);
        let _ = writeln!(
            doc,
            "- **Observed at:** {} frame(s), first at {} ms",
            entity.observed_timestamps_ms.len(),
            entity.observed_timestamps_ms.first().copied().unwrap_or(0)
        );
        match entity.pose {
            Some(pose) => {
                doc.push_str("- **Estimated location:**\n");
                let _ = writeln!(doc, "  - Timestamp: {} ms", pose.timestamp_ms);
                let _ = writeln!(doc, "  - X: {:.2} m, Y: {:.2} m", pose.x, pose.y);
                let _ = writeln!(doc, "  - Heading: {:.1}\u{b0}", pose.heading_degrees);
            }
            None => {
                doc.push_str("- **Estimated location:** location unavailable\n");
            }
        }
        doc.push_str("\n---\n");
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::model::{ContextualAnalysis, EntityId, LandmarkObservation, PoseSample, UNKNOWN};

    fn mission(root: &std::path::Path) -> Mission {
        Mission {
            id: "m01".to_string(),
            output_root: root.to_path_buf(),
        }
    }

    fn entity(id: EntityId, pose: Option<PoseSample>) -> LandmarkEntity {
        LandmarkEntity {
            id,
            representative: LandmarkObservation {
                timestamp_ms: 3000,
                category: "supply crate".to_string(),
                description: "a red metal crate".to_string(),
                analysis: ContextualAnalysis {
                    origin: "prior mission".to_string(),
                    utility: UNKNOWN.to_string(),
                    relevance: "high".to_string(),
                    hazard: "none apparent".to_string(),
                },
                jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            },
            observed_timestamps_ms: vec![3000, 4000],
            pose,
        }
    }

    fn posed() -> PoseSample {
        PoseSample {
            timestamp_ms: 3000,
            x: 3.0,
            y: 0.4,
            heading_degrees: 15.0,
        }
    }

    #[test]
    fn renders_summary_and_detail_sections() {
        let dir = TempDir::new().unwrap();
        let report = assemble(
            &mission(dir.path()),
            vec![entity(EntityId::first(), Some(posed()))],
            Some("One crate was found.".to_string()),
        );

        let doc = render_markdown(&report);
        assert!(doc.contains("# Mission Report: m01"));
        assert!(doc.contains("- **Distinct landmarks found:** 1"));
        assert!(doc.contains("One crate was found."));
        assert!(doc.contains("## Landmark LM-001"));
        assert!(doc.contains("- **Category:** supply crate"));
        assert!(doc.contains("X: 3.00 m, Y: 0.40 m"));
        assert!(doc.contains("../map_images/map_m01.png"));
        assert!(doc.contains("../landmark_images/m01_LM-001.jpg"));
    }

    #[test]
    fn missing_pose_reads_location_unavailable() {
        let dir = TempDir::new().unwrap();
        let report = assemble(
            &mission(dir.path()),
            vec![entity(EntityId::first(), None)],
            None,
        );

        let doc = render_markdown(&report);
        assert!(doc.contains("location unavailable"));
        assert!(doc.contains(SUMMARY_UNAVAILABLE));
    }

    #[test]
    fn zero_landmarks_explains_the_degradation() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&mission(dir.path()), Vec::new(), None);

        assert_eq!(report.summary, NO_LANDMARKS);
        let doc = render_markdown(&report);
        assert!(doc.contains("No landmarks were confirmed"));
    }

    #[test]
    fn writes_the_full_artifact_layout() {
        let dir = TempDir::new().unwrap();
        let mission = mission(dir.path());
        let report = assemble(&mission, vec![entity(EntityId::first(), Some(posed()))], None);
        let map = RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));

        let report_path = write(&mission, &report, &map).unwrap();

        assert_eq!(report_path, dir.path().join("m01/reports/report.md"));
        assert!(dir.path().join("m01/map_images/map_m01.png").is_file());
        assert!(
            dir.path()
                .join("m01/landmark_images/m01_LM-001.jpg")
                .is_file()
        );
    }

    #[test]
    fn rewriting_identical_inputs_is_byte_stable() {
        let dir = TempDir::new().unwrap();
        let mission = mission(dir.path());
        let report = assemble(&mission, vec![entity(EntityId::first(), Some(posed()))], None);
        let map = RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));

        let path = write(&mission, &report, &map).unwrap();
        let first = fs::read(&path).unwrap();
        let first_map = fs::read(dir.path().join("m01/map_images/map_m01.png")).unwrap();

        write(&mission, &report, &map).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
        assert_eq!(
            fs::read(dir.path().join("m01/map_images/map_m01.png")).unwrap(),
            first_map
        );
    }

    #[test]
    fn unwritable_root_is_a_write_error() {
        let report = assemble(
            &Mission {
                id: "m01".to_string(),
                output_root: PathBuf::from("/dev/null/not-a-dir"),
            },
            Vec::new(),
            None,
        );
        let map = RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
        let err = write(
            &Mission {
                id: "m01".to_string(),
                output_root: PathBuf::from("/dev/null/not-a-dir"),
            },
            &report,
            &map,
        )
        .unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }
}
