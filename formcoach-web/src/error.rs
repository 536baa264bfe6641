//! Error taxonomy
//!
//! Per-frame problems degrade one frame's output and never abort a session.
//! Learning problems are terminal for the one `learn` call that hit them.

use thiserror::Error;

use crate::physics::PoseLandmark;

/// Template learning failed; no template was produced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LearnError {
    /// Too few frames, or too few distinct feature vectors for the chosen K
    #[error("insufficient data for template learning: {reason}")]
    InsufficientData { reason: String },

    /// Caller asked to stop between k-means iterations
    #[error("template learning cancelled after {iterations} k-means iterations")]
    Cancelled { iterations: usize },
}

impl LearnError {
    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        LearnError::InsufficientData {
            reason: reason.into(),
        }
    }
}

/// Non-fatal learning condition, reported next to the learned template
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LearnWarning {
    /// A cluster ended k-means with zero members; its state was dropped
    #[error("cluster {cluster} received no members and was dropped")]
    EmptyCluster { cluster: usize },
}

/// Why a landmark could not be used for an angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissReason {
    Absent,
    LowConfidence(f32),
}

/// One angle was skipped for one frame
#[derive(Debug, Clone, PartialEq, Error)]
#[error("angle '{angle}' skipped: landmark {landmark:?} unusable ({reason:?})")]
pub struct MissingLandmarkData {
    pub angle: String,
    pub landmark: PoseLandmark,
    pub reason: MissReason,
}

/// Live session errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Template-relative classification or scoring requested with no template
    #[error("no exercise template loaded")]
    NoTemplateLoaded,

    /// Template was learned for a different exercise type
    #[error("template is for exercise type '{found}', session tracks '{expected}'")]
    TemplateMismatch { expected: String, found: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid exercise config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid exercise template: {0}")]
    Invalid(String),
}

/// Flat landmark array could not be framed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("invalid landmark data length: {len} (expected {expected_xyzv} or {expected_xyz})")]
    BadLength {
        len: usize,
        expected_xyzv: usize,
        expected_xyz: usize,
    },
}
