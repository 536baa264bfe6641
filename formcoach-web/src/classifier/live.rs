//! Live state classification against a learned template
//!
//! Nearest state by normalized distance:
//!   d(state) = sqrt(mean_i(((v_i - mean_i) / scale_i)^2))
//! where scale_i is the state's std dev for angle i, or a floor when the
//! state saw no spread at all.

use std::sync::Arc;

use serde::Serialize;

use super::template::{ExerciseTemplate, LearnedState, StateId};
use crate::physics::AngleVector;

/// Scale used for angles whose std dev is zero (degrees)
pub const DEFAULT_SCALE_FLOOR: f64 = 10.0;

/// Std devs at or below this are rounding noise of a constant signal
const ZERO_STD_DEV: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMatch {
    pub state_id: StateId,
    pub state_name: String,
    pub distance: f64,
}

/// Holds a template reference; classification never mutates it
#[derive(Clone, Debug)]
pub struct StateClassifier {
    template: Arc<ExerciseTemplate>,
    driver_angle: Option<String>,
    scale_floor: f64,
}

impl StateClassifier {
    pub fn new(template: Arc<ExerciseTemplate>) -> Self {
        let driver_angle = template.driver_angle();
        Self {
            template,
            driver_angle,
            scale_floor: DEFAULT_SCALE_FLOOR,
        }
    }

    pub fn with_scale_floor(mut self, floor: f64) -> Self {
        if floor > 0.0 {
            self.scale_floor = floor;
        }
        self
    }

    pub fn template(&self) -> &Arc<ExerciseTemplate> {
        &self.template
    }

    /// Angle with the widest spread of state means
    pub fn driver_angle(&self) -> Option<&str> {
        self.driver_angle.as_deref()
    }

    /// Normalized distance to one state over the angles both sides have.
    /// `None` when they share no angle.
    pub fn distance(&self, angles: &AngleVector, state: &LearnedState) -> Option<f64> {
        let mut sum = 0.0;
        let mut n = 0usize;
        for (name, stats) in &state.angle_stats {
            let Some(value) = angles.get(name) else {
                continue;
            };
            let scale = if stats.std_dev > ZERO_STD_DEV {
                stats.std_dev
            } else {
                self.scale_floor
            };
            sum += ((value - stats.mean) / scale).powi(2);
            n += 1;
        }
        (n > 0).then(|| (sum / n as f64).sqrt())
    }

    /// Nearest state; ties go to the earlier state
    pub fn classify(&self, angles: &AngleVector) -> Option<StateMatch> {
        let mut best: Option<(&LearnedState, f64)> = None;
        for state in &self.template.states {
            let Some(d) = self.distance(angles, state) else {
                continue;
            };
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((state, d));
            }
        }

        best.map(|(state, distance)| StateMatch {
            state_id: state.id,
            state_name: state.name.clone(),
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::template::tests::{state, two_state_template};
    use approx::assert_abs_diff_eq;

    fn classifier() -> StateClassifier {
        StateClassifier::new(Arc::new(two_state_template()))
    }

    #[test]
    fn test_picks_nearest_state() {
        let c = classifier();
        let bent = AngleVector::new(0.0).with("right_knee", 95.0).with("right_hip", 96.0);
        let straight = AngleVector::new(0.0).with("right_knee", 160.0).with("right_hip", 99.0);

        assert_eq!(c.classify(&bent).unwrap().state_name, "state_1");
        assert_eq!(c.classify(&straight).unwrap().state_id, 1);
        assert_eq!(c.driver_angle(), Some("right_knee"));
    }

    #[test]
    fn test_exact_mean_is_zero_distance() {
        let c = classifier();
        let v = AngleVector::new(0.0).with("right_knee", 170.0).with("right_hip", 100.0);
        let m = c.classify(&v).unwrap();
        assert_eq!(m.state_id, 1);
        assert_abs_diff_eq!(m.distance, 0.0);
    }

    #[test]
    fn test_distance_formula() {
        let c = classifier();
        let s = state(0, "s", &[("knee", 100.0, 5.0), ("hip", 80.0, 0.0)]);
        // knee: (110-100)/5 = 2, hip: (90-80)/10 = 1  => sqrt((4+1)/2)
        let v = AngleVector::new(0.0).with("knee", 110.0).with("hip", 90.0);
        assert_abs_diff_eq!(c.distance(&v, &s).unwrap(), (2.5f64).sqrt(), epsilon = 1e-12);

        // Rounding-level spread counts as no spread
        let flat = state(0, "s", &[("hip", 80.0, 1e-14)]);
        let v = AngleVector::new(0.0).with("hip", 80.00000000000003);
        assert!(c.distance(&v, &flat).unwrap() < 1e-9);
    }

    #[test]
    fn test_missing_angles_skipped() {
        let c = classifier();
        let only_knee = AngleVector::new(0.0).with("right_knee", 92.0);
        assert_eq!(c.classify(&only_knee).unwrap().state_id, 0);

        let unrelated = AngleVector::new(0.0).with("left_elbow", 40.0);
        assert!(c.classify(&unrelated).is_none());
    }
}
