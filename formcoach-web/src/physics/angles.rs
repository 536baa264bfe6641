//! Joint and segment angle extraction
//!
//! Joint angle: interior angle at B between B→A and B→C, folded into [0, 180].
//! Segment angle: angle of start→end against image vertical, in [0, 180].
//!
//! - 180° joint = fully straight (e.g. locked knee)
//! - 0° segment = pointing straight down the image

use std::collections::BTreeMap;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::confidence_gate::ConfidenceGate;
use super::landmarks::{LandmarkFrame, PoseLandmark};
use crate::error::MissingLandmarkData;

// ============================================================================
// ANGLE MATH
// ============================================================================

/// Interior angle at `b` in degrees, [0, 180]
pub fn joint_angle(a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>) -> f64 {
    let ba = (a - b).cast::<f64>();
    let bc = (c - b).cast::<f64>();
    let raw = (bc.y.atan2(bc.x) - ba.y.atan2(ba.x)).abs().to_degrees();
    if raw > 180.0 {
        360.0 - raw
    } else {
        raw
    }
}

/// Angle of the start→end segment from vertical in degrees, [0, 180]
pub fn segment_angle(start: Vector2<f32>, end: Vector2<f32>) -> f64 {
    let d = (end - start).cast::<f64>();
    d.x.atan2(d.y).abs().to_degrees()
}

// ============================================================================
// ANGLE DEFINITIONS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AngleKind {
    /// Interior angle at `b`
    Joint {
        a: PoseLandmark,
        b: PoseLandmark,
        c: PoseLandmark,
    },
    /// Segment start→end against vertical
    Segment {
        start: PoseLandmark,
        end: PoseLandmark,
    },
}

impl AngleKind {
    /// Landmarks this angle depends on
    pub fn landmarks(&self) -> Vec<PoseLandmark> {
        match *self {
            AngleKind::Joint { a, b, c } => vec![a, b, c],
            AngleKind::Segment { start, end } => vec![start, end],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngleDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: AngleKind,
}

impl AngleDefinition {
    pub fn joint(name: &str, a: PoseLandmark, b: PoseLandmark, c: PoseLandmark) -> Self {
        Self {
            name: name.to_string(),
            kind: AngleKind::Joint { a, b, c },
        }
    }

    pub fn segment(name: &str, start: PoseLandmark, end: PoseLandmark) -> Self {
        Self {
            name: name.to_string(),
            kind: AngleKind::Segment { start, end },
        }
    }

    /// Commonly tracked body angles
    pub fn standard_catalog() -> Vec<AngleDefinition> {
        use PoseLandmark::*;
        vec![
            Self::joint("left_elbow", LeftShoulder, LeftElbow, LeftWrist),
            Self::joint("right_elbow", RightShoulder, RightElbow, RightWrist),
            Self::joint("left_shoulder", LeftElbow, LeftShoulder, LeftHip),
            Self::joint("right_shoulder", RightElbow, RightShoulder, RightHip),
            Self::joint("left_hip", LeftShoulder, LeftHip, LeftKnee),
            Self::joint("right_hip", RightShoulder, RightHip, RightKnee),
            Self::joint("left_knee", LeftHip, LeftKnee, LeftAnkle),
            Self::joint("right_knee", RightHip, RightKnee, RightAnkle),
            Self::segment("left_torso", LeftShoulder, LeftHip),
            Self::segment("right_torso", RightShoulder, RightHip),
            Self::segment("left_shin", LeftKnee, LeftAnkle),
            Self::segment("right_shin", RightKnee, RightAnkle),
        ]
    }
}

// ============================================================================
// ANGLE RECORDS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleSample {
    pub name: String,
    pub value_degrees: f64,
    pub timestamp_seconds: f64,
}

/// All angles extracted (or smoothed) for one frame
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AngleVector {
    pub timestamp: f64,
    pub values: BTreeMap<String, f64>,
}

impl AngleVector {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = AngleSample> + '_ {
        self.values.iter().map(move |(name, &value)| AngleSample {
            name: name.clone(),
            value_degrees: value,
            timestamp_seconds: self.timestamp,
        })
    }
}

/// Time-ordered samples of one named angle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngleSeries {
    pub name: String,
    pub samples: Vec<AngleSample>,
}

impl AngleSeries {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            samples: Vec::new(),
        }
    }

    /// Build from (timestamp, value) pairs
    pub fn from_points(name: &str, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut series = Self::new(name);
        for (t, v) in points {
            series.push(t, v);
        }
        series
    }

    pub fn push(&mut self, timestamp: f64, value: f64) {
        self.samples.push(AngleSample {
            name: self.name.clone(),
            value_degrees: value,
            timestamp_seconds: timestamp,
        });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.samples
            .iter()
            .map(|s| (s.timestamp_seconds, s.value_degrees))
    }
}

// ============================================================================
// EXTRACTOR
// ============================================================================

/// Result of extracting one frame
#[derive(Clone, Debug, Default)]
pub struct Extraction {
    pub angles: AngleVector,
    /// Angles skipped this frame; never fatal
    pub missing: Vec<MissingLandmarkData>,
}

/// Computes a configured set of angles from landmark frames. Stateless per frame.
#[derive(Clone, Debug)]
pub struct AngleExtractor {
    definitions: Vec<AngleDefinition>,
    gate: ConfidenceGate,
}

impl AngleExtractor {
    pub fn new(definitions: Vec<AngleDefinition>, confidence_floor: f32) -> Self {
        Self {
            definitions,
            gate: ConfidenceGate::new(confidence_floor),
        }
    }

    pub fn definitions(&self) -> &[AngleDefinition] {
        &self.definitions
    }

    pub fn extract(&self, frame: &LandmarkFrame) -> Extraction {
        let mut out = Extraction {
            angles: AngleVector::new(frame.timestamp),
            missing: Vec::new(),
        };

        for def in &self.definitions {
            match self.compute(def, frame) {
                Ok(value) => out.angles.insert(&def.name, value),
                Err(miss) => {
                    log::trace!("{}", miss);
                    out.missing.push(miss);
                }
            }
        }

        out
    }

    fn compute(
        &self,
        def: &AngleDefinition,
        frame: &LandmarkFrame,
    ) -> Result<f64, MissingLandmarkData> {
        let point = |id: PoseLandmark| {
            self.gate
                .admit(frame, id)
                .map(|lm| lm.position)
                .map_err(|reason| MissingLandmarkData {
                    angle: def.name.clone(),
                    landmark: id,
                    reason,
                })
        };

        match def.kind {
            AngleKind::Joint { a, b, c } => Ok(joint_angle(point(a)?, point(b)?, point(c)?)),
            AngleKind::Segment { start, end } => Ok(segment_angle(point(start)?, point(end)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MissReason;
    use crate::physics::landmarks::Landmark;
    use approx::assert_abs_diff_eq;

    fn v(x: f32, y: f32) -> Vector2<f32> {
        Vector2::new(x, y)
    }

    #[test]
    fn test_straight_joint() {
        let angle = joint_angle(v(0.0, 0.0), v(0.5, 0.0), v(1.0, 0.0));
        assert_abs_diff_eq!(angle, 180.0, epsilon = 1e-4);
    }

    #[test]
    fn test_bent_joint() {
        let angle = joint_angle(v(0.0, 0.0), v(0.5, 0.0), v(0.5, 0.5));
        assert_abs_diff_eq!(angle, 90.0, epsilon = 1e-4);
    }

    #[test]
    fn test_joint_reflex_is_folded() {
        // atan2 difference of 270° must read as 90°
        let angle = joint_angle(v(0.0, -1.0), v(0.0, 0.0), v(-1.0, 0.0));
        assert_abs_diff_eq!(angle, 90.0, epsilon = 1e-4);
    }

    #[test]
    fn test_segment_vertical_and_horizontal() {
        assert_abs_diff_eq!(segment_angle(v(0.5, 0.2), v(0.5, 0.6)), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(segment_angle(v(0.5, 0.6), v(0.5, 0.2)), 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(segment_angle(v(0.2, 0.5), v(0.6, 0.5)), 90.0, epsilon = 1e-4);
        assert_abs_diff_eq!(segment_angle(v(0.6, 0.5), v(0.2, 0.5)), 90.0, epsilon = 1e-4);
    }

    #[test]
    fn test_missing_landmark_skips_only_that_angle() {
        use PoseLandmark::*;
        let frame = LandmarkFrame::empty(1.0)
            .with(RightHip, Landmark::new(0.5, 0.4, 0.9))
            .with(RightKnee, Landmark::new(0.5, 0.6, 0.9))
            .with(RightAnkle, Landmark::new(0.5, 0.8, 0.9))
            .with(LeftHip, Landmark::new(0.4, 0.4, 0.9))
            .with(LeftKnee, Landmark::new(0.4, 0.6, 0.1));

        let extractor = AngleExtractor::new(
            vec![
                AngleDefinition::joint("right_knee", RightHip, RightKnee, RightAnkle),
                AngleDefinition::joint("left_knee", LeftHip, LeftKnee, LeftAnkle),
            ],
            0.5,
        );
        let out = extractor.extract(&frame);

        assert_abs_diff_eq!(out.angles.get("right_knee").unwrap(), 180.0, epsilon = 1e-4);
        assert!(out.angles.get("left_knee").is_none());
        assert_eq!(out.missing.len(), 1);
        assert_eq!(out.missing[0].landmark, LeftKnee);
        assert_eq!(out.missing[0].reason, MissReason::LowConfidence(0.1));
    }

    #[test]
    fn test_empty_frame_is_empty_result() {
        let extractor = AngleExtractor::new(AngleDefinition::standard_catalog(), 0.5);
        let out = extractor.extract(&LandmarkFrame::empty(0.0));
        assert!(out.angles.is_empty());
        assert_eq!(out.missing.len(), AngleDefinition::standard_catalog().len());
    }

    #[test]
    fn test_definition_json_shape() {
        let def = AngleDefinition::segment("left_torso", PoseLandmark::LeftShoulder, PoseLandmark::LeftHip);
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["mode"], "segment");
        assert_eq!(json["start"], "left_shoulder");
        let back: AngleDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, def);
    }
}
