//! Core data model for Cairn.
//!
//! These types trace the pipeline end to end: pose samples along the
//! drive, sampled video frames, raw per-frame observations, merged
//! landmark entities, and the final mission report.

mod entity;
mod frame;
mod observation;
mod pose;
mod report;

pub use entity::{EntityId, LandmarkEntity};
pub use frame::Frame;
pub use observation::{ContextualAnalysis, LandmarkObservation, UNKNOWN};
pub use pose::PoseSample;
pub use report::{Mission, MissionReport};
