//! Exercise configuration
//!
//! Loaded from and saved to JSON text; where the text lives is the caller's
//! business. Everything that tunes the pipeline for one exercise sits here,
//! including the hand-tuned hysteresis limits of each preset.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::classifier::{LearnerConfig, ThresholdState};
use crate::error::ConfigError;
use crate::physics::{AngleDefinition, OneEuroConfig, SegmenterConfig, DEFAULT_CONFIDENCE_FLOOR};
use crate::reps::{HysteresisConfig, RepStrategyConfig, SequenceConfig};
use crate::scoring::ScoringConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseConfig {
    pub exercise_name: String,
    pub exercise_type: String,
    pub angle_definitions: Vec<AngleDefinition>,
    /// Angles recorded for learning and tracked live
    pub angles_of_interest: Vec<String>,
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f32,
    #[serde(default)]
    pub smoothing: OneEuroConfig,
    #[serde(default)]
    pub segmentation: SegmenterConfig,
    #[serde(default)]
    pub rep_strategy: RepStrategyConfig,
    /// Fallback state bands used while no template is loaded
    #[serde(default)]
    pub threshold_states: Vec<ThresholdState>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub learner: LearnerConfig,
}

fn default_confidence_floor() -> f32 {
    DEFAULT_CONFIDENCE_FLOOR
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

impl ExerciseConfig {
    /// Parse and validate
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ExerciseConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn definition(&self, name: &str) -> Option<&AngleDefinition> {
        self.angle_definitions.iter().find(|d| d.name == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exercise_type.trim().is_empty() {
            return Err(invalid("exercise type is empty"));
        }

        let mut defined = BTreeSet::new();
        for def in &self.angle_definitions {
            if !defined.insert(def.name.as_str()) {
                return Err(invalid(format!("angle '{}' defined twice", def.name)));
            }
        }

        if self.angles_of_interest.is_empty() {
            return Err(invalid("no angles of interest"));
        }
        if let Some(name) = self
            .angles_of_interest
            .iter()
            .find(|n| !defined.contains(n.as_str()))
        {
            return Err(invalid(format!("angle of interest '{}' is not defined", name)));
        }

        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(invalid(format!(
                "confidence floor {} outside [0, 1]",
                self.confidence_floor
            )));
        }

        let s = &self.smoothing;
        if !(s.min_cutoff > 0.0 && s.d_cutoff > 0.0 && s.beta >= 0.0) {
            return Err(invalid("smoothing cutoffs must be positive and beta non-negative"));
        }

        match &self.rep_strategy {
            RepStrategyConfig::Sequence(c) => {
                if c.debounce_s < 0.0 || c.cooldown_s < 0.0 {
                    return Err(invalid("sequence debounce and cooldown must be non-negative"));
                }
            }
            RepStrategyConfig::Hysteresis(c) => {
                if let Some(primary) = &c.primary_angle {
                    if !self.angles_of_interest.contains(primary) {
                        return Err(invalid(format!(
                            "primary angle '{}' is not an angle of interest",
                            primary
                        )));
                    }
                }
                if c.band_deg_per_s < 0.0 || c.cooldown_s < 0.0 || c.window_s <= 0.0 {
                    return Err(invalid(
                        "hysteresis band and cooldown must be non-negative, window positive",
                    ));
                }
            }
        }

        for band in &self.threshold_states {
            if !defined.contains(band.angle.as_str()) {
                return Err(invalid(format!(
                    "threshold state '{}' uses undefined angle '{}'",
                    band.name, band.angle
                )));
            }
            if band.min_degrees > band.max_degrees {
                return Err(invalid(format!(
                    "threshold state '{}' has min above max",
                    band.name
                )));
            }
        }

        if self.learner.min_states < 2 || self.learner.max_states < self.learner.min_states {
            return Err(invalid("learner needs at least 2 states and max >= min"));
        }

        Ok(())
    }

    /// Built-in preset by exercise type
    pub fn preset(exercise_type: &str) -> Option<Self> {
        match exercise_type {
            "knee_extension" => Some(Self::knee_extension()),
            "squat" => Some(Self::squat()),
            "bicep_curl" => Some(Self::bicep_curl()),
            _ => None,
        }
    }

    fn base(name: &str, exercise_type: &str, angles: &[&str]) -> Self {
        let catalog = AngleDefinition::standard_catalog();
        Self {
            exercise_name: name.to_string(),
            exercise_type: exercise_type.to_string(),
            angle_definitions: catalog
                .into_iter()
                .filter(|d| angles.contains(&d.name.as_str()))
                .collect(),
            angles_of_interest: angles.iter().map(|s| s.to_string()).collect(),
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            smoothing: OneEuroConfig::default(),
            segmentation: SegmenterConfig::default(),
            rep_strategy: RepStrategyConfig::default(),
            threshold_states: Vec::new(),
            scoring: ScoringConfig::default(),
            learner: LearnerConfig::default(),
        }
    }

    pub fn knee_extension() -> Self {
        Self {
            rep_strategy: RepStrategyConfig::Hysteresis(HysteresisConfig::knee_extension()),
            threshold_states: vec![
                ThresholdState::new("flexed", "right_knee", 0.0, 110.0),
                ThresholdState::new("extended", "right_knee", 150.0, 180.0),
            ],
            ..Self::base("Knee Extension", "knee_extension", &["right_knee", "right_hip"])
        }
    }

    pub fn squat() -> Self {
        Self {
            rep_strategy: RepStrategyConfig::Sequence(SequenceConfig {
                sequence: vec!["standing".into(), "bottom".into(), "standing".into()],
                debounce_s: 0.2,
                cooldown_s: 0.5,
            }),
            threshold_states: vec![
                ThresholdState::new("standing", "right_knee", 160.0, 180.0),
                ThresholdState::new("bottom", "right_knee", 0.0, 120.0),
            ],
            ..Self::base(
                "Squat",
                "squat",
                &["right_knee", "right_hip", "left_knee", "left_hip", "right_torso"],
            )
        }
    }

    pub fn bicep_curl() -> Self {
        Self {
            rep_strategy: RepStrategyConfig::Hysteresis(HysteresisConfig::bicep_curl()),
            threshold_states: vec![
                ThresholdState::new("extended", "right_elbow", 140.0, 180.0),
                ThresholdState::new("curled", "right_elbow", 0.0, 70.0),
            ],
            ..Self::base("Bicep Curl", "bicep_curl", &["right_elbow", "right_shoulder"])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for t in ["knee_extension", "squat", "bicep_curl"] {
            let cfg = ExerciseConfig::preset(t).unwrap();
            assert_eq!(cfg.exercise_type, t);
            cfg.validate().unwrap();
            assert_eq!(cfg.angle_definitions.len(), cfg.angles_of_interest.len());
        }
        assert!(ExerciseConfig::preset("jumping_jack").is_none());
    }

    #[test]
    fn test_json_save_load() {
        let cfg = ExerciseConfig::squat();
        let json = cfg.to_json().unwrap();
        assert!(json.contains("\"anglesOfInterest\""));
        assert!(json.contains("\"strategy\": \"sequence\""));
        assert_eq!(ExerciseConfig::from_json(&json).unwrap(), cfg);
    }

    #[test]
    fn test_minimal_json_takes_defaults() {
        let json = r#"{
            "exerciseName": "Knee",
            "exerciseType": "knee_extension",
            "angleDefinitions": [
                {"name": "right_knee", "mode": "joint", "a": "right_hip", "b": "right_knee", "c": "right_ankle"}
            ],
            "anglesOfInterest": ["right_knee"]
        }"#;
        let cfg = ExerciseConfig::from_json(json).unwrap();
        assert_eq!(cfg.confidence_floor, DEFAULT_CONFIDENCE_FLOOR);
        assert_eq!(cfg.smoothing, OneEuroConfig::default());
        assert_eq!(cfg.rep_strategy, RepStrategyConfig::default());
    }

    #[test]
    fn test_undefined_angle_of_interest_rejected() {
        let mut cfg = ExerciseConfig::knee_extension();
        cfg.angles_of_interest.push("left_wrist_twist".to_string());
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_untracked_primary_angle_rejected() {
        let mut cfg = ExerciseConfig::knee_extension();
        cfg.angles_of_interest = vec!["right_hip".to_string()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_json_is_json_error() {
        assert!(matches!(ExerciseConfig::from_json("{"), Err(ConfigError::Json(_))));
    }
}
