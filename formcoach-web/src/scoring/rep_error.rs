//! Per-rep form error against the nearest template state

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::summary::RepErrorSummary;
use crate::classifier::StateClassifier;
use crate::physics::AngleVector;
use crate::reps::RepEvent;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    /// Average percent error above which an angle is called out
    pub mistake_threshold_pct: f64,
    /// Half-vs-half change in average error that flips the trend (degrees)
    pub trend_threshold_deg: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mistake_threshold_pct: 20.0,
            trend_threshold_deg: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleError {
    pub expected: f64,
    pub actual: f64,
    pub absolute_error: f64,
    /// Absolute error as a share of the state's observed range; 0 for a zero range
    pub percent_error: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepError {
    pub rep_number: u32,
    pub timestamp: f64,
    pub per_angle_error: BTreeMap<String, AngleError>,
    pub overall_error: f64,
    pub form_score: f64,
    pub matched_state_name: String,
}

/// Score one rep. `None` when no state shares an angle with `angles`.
pub fn score_rep(
    event: &RepEvent,
    angles: &AngleVector,
    classifier: &StateClassifier,
) -> Option<RepError> {
    let matched = classifier.classify(angles)?;
    let state = classifier.template().state(matched.state_id)?;

    let per_angle_error: BTreeMap<String, AngleError> = state
        .angle_stats
        .iter()
        .filter_map(|(name, stats)| {
            let actual = angles.get(name)?;
            let absolute_error = (actual - stats.mean).abs();
            let range = stats.range();
            let percent_error = if range > 0.0 {
                absolute_error / range * 100.0
            } else {
                0.0
            };
            Some((
                name.clone(),
                AngleError {
                    expected: stats.mean,
                    actual,
                    absolute_error,
                    percent_error,
                },
            ))
        })
        .collect();

    let overall_error = if per_angle_error.is_empty() {
        0.0
    } else {
        per_angle_error.values().map(|e| e.absolute_error).sum::<f64>()
            / per_angle_error.len() as f64
    };

    Some(RepError {
        rep_number: event.rep_number,
        timestamp: event.timestamp,
        per_angle_error,
        overall_error,
        form_score: (100.0 - overall_error / 2.0).clamp(0.0, 100.0),
        matched_state_name: matched.state_name,
    })
}

/// Session-long list of rep errors and its running summary
#[derive(Clone, Debug, Default)]
pub struct RepErrorScorer {
    config: ScoringConfig,
    errors: Vec<RepError>,
    summary: Option<RepErrorSummary>,
}

impl RepErrorScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            errors: Vec::new(),
            summary: None,
        }
    }

    /// Score the rep, append it and recompute the summary
    pub fn record(
        &mut self,
        event: &RepEvent,
        angles: &AngleVector,
        classifier: &StateClassifier,
    ) -> Option<&RepError> {
        let error = score_rep(event, angles, classifier)?;
        log::debug!(
            "rep {} scored {:.1} (error {:.1}° vs {})",
            error.rep_number,
            error.form_score,
            error.overall_error,
            error.matched_state_name
        );
        self.errors.push(error);
        self.summary = RepErrorSummary::from_errors(&self.errors, &self.config);
        self.errors.last()
    }

    pub fn errors(&self) -> &[RepError] {
        &self.errors
    }

    pub fn last(&self) -> Option<&RepError> {
        self.errors.last()
    }

    pub fn summary(&self) -> Option<&RepErrorSummary> {
        self.summary.as_ref()
    }

    pub fn reset(&mut self) {
        self.errors.clear();
        self.summary = None;
    }
}
