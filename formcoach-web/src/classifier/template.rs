//! Exercise template records
//!
//! A template is learned once from a reference recording and then only read.
//! Sessions hold it behind an `Arc` and swap the whole reference to update it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

pub type StateId = u32;

/// Summary statistics of one angle within one state
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl AngleStats {
    /// Population statistics; `None` for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
        })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// A contiguous stretch of time spent in one state
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub start_time: f64,
    pub end_time: f64,
}

impl Occurrence {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn midpoint(&self) -> f64 {
        (self.start_time + self.end_time) / 2.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedState {
    pub id: StateId,
    pub name: String,
    pub angle_stats: BTreeMap<String, AngleStats>,
    pub occurrences: Vec<Occurrence>,
    pub representative_timestamp: f64,
}

impl LearnedState {
    pub fn first_start(&self) -> Option<f64> {
        self.occurrences.first().map(|o| o.start_time)
    }

    pub fn mean_of(&self, angle: &str) -> Option<f64> {
        self.angle_stats.get(angle).map(|s| s.mean)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleChange {
    pub start_angle: f64,
    pub end_angle: f64,
    pub delta: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransition {
    pub from_state_id: StateId,
    pub to_state_id: StateId,
    pub duration_seconds: f64,
    pub angle_changes: BTreeMap<String, AngleChange>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseTemplate {
    pub exercise_name: String,
    pub exercise_type: String,
    pub states: Vec<LearnedState>,
    pub transitions: Vec<StateTransition>,
    pub canonical_state_sequence: Vec<StateId>,
    pub total_duration_seconds: f64,
    pub recommended_reps: u32,
    pub confidence_score: f64,
}

impl ExerciseTemplate {
    /// Check the structural invariants every usable template must hold
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.states.len() < 2 {
            return Err(TemplateError::Invalid(format!(
                "template needs at least 2 states, has {}",
                self.states.len()
            )));
        }

        let mut ids = BTreeSet::new();
        for state in &self.states {
            if !ids.insert(state.id) {
                return Err(TemplateError::Invalid(format!("duplicate state id {}", state.id)));
            }
            if state.occurrences.is_empty() {
                return Err(TemplateError::Invalid(format!(
                    "state {} has no occurrences",
                    state.id
                )));
            }
        }

        if let Some(bad) = self
            .canonical_state_sequence
            .iter()
            .find(|id| !ids.contains(id))
        {
            return Err(TemplateError::Invalid(format!(
                "canonical sequence references unknown state {bad}"
            )));
        }

        for t in &self.transitions {
            if !ids.contains(&t.from_state_id) || !ids.contains(&t.to_state_id) {
                return Err(TemplateError::Invalid(format!(
                    "transition {} -> {} references an unknown state",
                    t.from_state_id, t.to_state_id
                )));
            }
        }

        if !(0.0..=100.0).contains(&self.confidence_score) {
            return Err(TemplateError::Invalid(format!(
                "confidence score {} outside [0, 100]",
                self.confidence_score
            )));
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a persisted template
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let template: ExerciseTemplate = serde_json::from_str(json)?;
        template.validate()?;
        Ok(template)
    }

    pub fn state(&self, id: StateId) -> Option<&LearnedState> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn state_by_name(&self, name: &str) -> Option<&LearnedState> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Every angle that has statistics in at least one state, sorted
    pub fn tracked_angles(&self) -> Vec<String> {
        self.states
            .iter()
            .flat_map(|s| s.angle_stats.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Angle whose state means are spread furthest apart
    pub fn driver_angle(&self) -> Option<String> {
        let mut best: Option<(String, f64)> = None;
        for angle in self.tracked_angles() {
            let means: Vec<f64> = self.states.iter().filter_map(|s| s.mean_of(&angle)).collect();
            let lo = means.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let spread = hi - lo;
            if best.as_ref().map_or(true, |(_, s)| spread > *s) {
                best = Some((angle, spread));
            }
        }
        best.map(|(name, _)| name)
    }

    /// One repetition's worth of the canonical sequence.
    ///
    /// Starts at the first state that recurs and runs to its next visit, e.g.
    /// `[2, 0, 1, 0, 1]` gives `[0, 1, 0]`. Falls back to the full sequence
    /// when no state recurs.
    pub fn rep_cycle(&self) -> Vec<StateId> {
        let seq = &self.canonical_state_sequence;
        for (i, id) in seq.iter().enumerate() {
            if let Some(offset) = seq[i + 1..].iter().position(|x| x == id) {
                return seq[i..=i + 1 + offset].to_vec();
            }
        }
        seq.clone()
    }

    pub fn rep_cycle_names(&self) -> Vec<String> {
        self.rep_cycle()
            .into_iter()
            .filter_map(|id| self.state(id).map(|s| s.name.clone()))
            .collect()
    }
}
