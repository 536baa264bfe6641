//! Threshold-band state detection
//!
//! Used when no template is loaded: each band names a state and the angle
//! range that means "in this state". First matching band wins.

use serde::{Deserialize, Serialize};

use crate::physics::AngleVector;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdState {
    pub name: String,
    pub angle: String,
    pub min_degrees: f64,
    pub max_degrees: f64,
}

impl ThresholdState {
    pub fn new(name: &str, angle: &str, min_degrees: f64, max_degrees: f64) -> Self {
        Self {
            name: name.to_string(),
            angle: angle.to_string(),
            min_degrees,
            max_degrees,
        }
    }

    /// Inclusive on both ends
    pub fn contains(&self, angles: &AngleVector) -> bool {
        angles
            .get(&self.angle)
            .map_or(false, |v| v >= self.min_degrees && v <= self.max_degrees)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ThresholdClassifier {
    states: Vec<ThresholdState>,
}

impl ThresholdClassifier {
    pub fn new(states: Vec<ThresholdState>) -> Self {
        Self { states }
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[ThresholdState] {
        &self.states
    }

    pub fn classify(&self, angles: &AngleVector) -> Option<&str> {
        self.states
            .iter()
            .find(|s| s.contains(angles))
            .map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knee_bands() -> ThresholdClassifier {
        ThresholdClassifier::new(vec![
            ThresholdState::new("flexed", "right_knee", 0.0, 110.0),
            ThresholdState::new("extended", "right_knee", 150.0, 180.0),
        ])
    }

    #[test]
    fn test_first_matching_band() {
        let c = knee_bands();
        assert_eq!(c.classify(&AngleVector::new(0.0).with("right_knee", 95.0)), Some("flexed"));
        assert_eq!(c.classify(&AngleVector::new(0.0).with("right_knee", 150.0)), Some("extended"));
    }

    #[test]
    fn test_gap_and_missing_angle() {
        let c = knee_bands();
        assert_eq!(c.classify(&AngleVector::new(0.0).with("right_knee", 130.0)), None);
        assert_eq!(c.classify(&AngleVector::new(0.0).with("left_knee", 95.0)), None);
    }
}
