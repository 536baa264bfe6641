//! Pose landmark identifiers and per-frame landmark storage
//!
//! Indices follow MediaPipe Pose (33 landmarks). Lookups are by enum, so a
//! missing point is an explicit `None` rather than a stray default.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Number of landmarks in a MediaPipe Pose frame
pub const LANDMARK_COUNT: usize = 33;

// ============================================================================
// LANDMARK IDENTIFIERS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseLandmark {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl PoseLandmark {
    /// All landmarks in MediaPipe index order
    pub const ALL: [PoseLandmark; LANDMARK_COUNT] = [
        PoseLandmark::Nose,
        PoseLandmark::LeftEyeInner,
        PoseLandmark::LeftEye,
        PoseLandmark::LeftEyeOuter,
        PoseLandmark::RightEyeInner,
        PoseLandmark::RightEye,
        PoseLandmark::RightEyeOuter,
        PoseLandmark::LeftEar,
        PoseLandmark::RightEar,
        PoseLandmark::MouthLeft,
        PoseLandmark::MouthRight,
        PoseLandmark::LeftShoulder,
        PoseLandmark::RightShoulder,
        PoseLandmark::LeftElbow,
        PoseLandmark::RightElbow,
        PoseLandmark::LeftWrist,
        PoseLandmark::RightWrist,
        PoseLandmark::LeftPinky,
        PoseLandmark::RightPinky,
        PoseLandmark::LeftIndex,
        PoseLandmark::RightIndex,
        PoseLandmark::LeftThumb,
        PoseLandmark::RightThumb,
        PoseLandmark::LeftHip,
        PoseLandmark::RightHip,
        PoseLandmark::LeftKnee,
        PoseLandmark::RightKnee,
        PoseLandmark::LeftAnkle,
        PoseLandmark::RightAnkle,
        PoseLandmark::LeftHeel,
        PoseLandmark::RightHeel,
        PoseLandmark::LeftFootIndex,
        PoseLandmark::RightFootIndex,
    ];

    /// MediaPipe index of this landmark
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            PoseLandmark::Nose => "nose",
            PoseLandmark::LeftEyeInner => "left_eye_inner",
            PoseLandmark::LeftEye => "left_eye",
            PoseLandmark::LeftEyeOuter => "left_eye_outer",
            PoseLandmark::RightEyeInner => "right_eye_inner",
            PoseLandmark::RightEye => "right_eye",
            PoseLandmark::RightEyeOuter => "right_eye_outer",
            PoseLandmark::LeftEar => "left_ear",
            PoseLandmark::RightEar => "right_ear",
            PoseLandmark::MouthLeft => "mouth_left",
            PoseLandmark::MouthRight => "mouth_right",
            PoseLandmark::LeftShoulder => "left_shoulder",
            PoseLandmark::RightShoulder => "right_shoulder",
            PoseLandmark::LeftElbow => "left_elbow",
            PoseLandmark::RightElbow => "right_elbow",
            PoseLandmark::LeftWrist => "left_wrist",
            PoseLandmark::RightWrist => "right_wrist",
            PoseLandmark::LeftPinky => "left_pinky",
            PoseLandmark::RightPinky => "right_pinky",
            PoseLandmark::LeftIndex => "left_index",
            PoseLandmark::RightIndex => "right_index",
            PoseLandmark::LeftThumb => "left_thumb",
            PoseLandmark::RightThumb => "right_thumb",
            PoseLandmark::LeftHip => "left_hip",
            PoseLandmark::RightHip => "right_hip",
            PoseLandmark::LeftKnee => "left_knee",
            PoseLandmark::RightKnee => "right_knee",
            PoseLandmark::LeftAnkle => "left_ankle",
            PoseLandmark::RightAnkle => "right_ankle",
            PoseLandmark::LeftHeel => "left_heel",
            PoseLandmark::RightHeel => "right_heel",
            PoseLandmark::LeftFootIndex => "left_foot_index",
            PoseLandmark::RightFootIndex => "right_foot_index",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.name() == name)
    }
}

// ============================================================================
// LANDMARK DATA STRUCTURES
// ============================================================================

/// A single detected point (normalized image coordinates)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    pub position: Vector2<f32>,
    /// Relative depth, when the pose model provides it
    pub z: Option<f32>,
    /// Visibility / confidence in [0, 1]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            position: Vector2::new(x, y),
            z: None,
            visibility,
        }
    }

    pub fn with_depth(mut self, z: f32) -> Self {
        self.z = Some(z);
        self
    }
}

/// One frame of pose output. Owned by the caller for a single processing step.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkFrame {
    points: [Option<Landmark>; LANDMARK_COUNT],
    /// Capture timestamp in seconds
    pub timestamp: f64,
}

impl LandmarkFrame {
    /// Frame with no detected points
    pub fn empty(timestamp: f64) -> Self {
        Self {
            points: [None; LANDMARK_COUNT],
            timestamp,
        }
    }

    pub fn set(&mut self, id: PoseLandmark, landmark: Landmark) {
        self.points[id.index()] = Some(landmark);
    }

    pub fn with(mut self, id: PoseLandmark, landmark: Landmark) -> Self {
        self.set(id, landmark);
        self
    }

    pub fn clear(&mut self, id: PoseLandmark) {
        self.points[id.index()] = None;
    }

    pub fn get(&self, id: PoseLandmark) -> Option<&Landmark> {
        self.points.get(id.index()).and_then(|p| p.as_ref())
    }

    /// Number of points present in this frame
    pub fn detected_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for (i, lm) in PoseLandmark::ALL.iter().enumerate() {
            assert_eq!(lm.index(), i);
            assert_eq!(PoseLandmark::from_index(i), Some(*lm));
            assert_eq!(PoseLandmark::from_name(lm.name()), Some(*lm));
        }
        assert_eq!(PoseLandmark::from_index(LANDMARK_COUNT), None);
        assert_eq!(PoseLandmark::RightKnee.index(), 26);
    }

    #[test]
    fn test_missing_point_is_none() {
        let frame = LandmarkFrame::empty(0.0)
            .with(PoseLandmark::LeftHip, Landmark::new(0.4, 0.5, 0.9));
        assert!(frame.get(PoseLandmark::LeftHip).is_some());
        assert!(frame.get(PoseLandmark::LeftKnee).is_none());
        assert_eq!(frame.detected_count(), 1);
    }

    #[test]
    fn test_serde_names_match() {
        let json = serde_json::to_string(&PoseLandmark::LeftFootIndex).unwrap();
        assert_eq!(json, "\"left_foot_index\"");
    }
}
