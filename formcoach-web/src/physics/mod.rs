//! Physics module - landmarks to clean angle signals
//!
//! Re-exports only. All logic in submodules.

mod landmarks;
mod confidence_gate;
mod angles;
mod one_euro;
mod velocity;
mod segmentation;

pub use landmarks::{Landmark, LandmarkFrame, PoseLandmark, LANDMARK_COUNT};
pub use confidence_gate::{ConfidenceGate, DEFAULT_CONFIDENCE_FLOOR};
pub use angles::{
    joint_angle, segment_angle, AngleDefinition, AngleExtractor, AngleKind, AngleSample,
    AngleSeries, AngleVector, Extraction,
};
pub use one_euro::{FilterBank, FilterState, OneEuroConfig, OneEuroFilter};
pub use velocity::{AngularVelocity, DEFAULT_RATE_ALPHA};
pub use segmentation::{MovementSegment, MovementSegmenter, SegmenterConfig};
