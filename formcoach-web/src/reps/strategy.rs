//! Repetition strategy seam
//!
//! Every counter sees the same per-frame observation (smoothed angles plus
//! whatever state label the session resolved) and may emit one event.
//! Counts only ever go up; `reset` is the only way back to zero.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::hysteresis::{HysteresisConfig, HysteresisCounter};
use super::sequence::{SequenceConfig, SequenceCounter};
use crate::classifier::ExerciseTemplate;
use crate::physics::AngleVector;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepEvent {
    /// 1-based and strictly increasing; equals the count after this event
    pub rep_number: u32,
    pub timestamp: f64,
    /// Passed every check of its strategy. Cycles that fail are not emitted,
    /// so this is true on every event a counter returns.
    pub valid: bool,
}

/// One frame as seen by a counter
#[derive(Clone, Copy, Debug)]
pub struct RepObservation<'a> {
    pub timestamp: f64,
    pub state: Option<&'a str>,
    pub angles: &'a AngleVector,
}

pub trait RepetitionStrategy: Debug {
    fn name(&self) -> &'static str;

    /// Feed one frame. Returns an event only when a rep is counted.
    fn observe(&mut self, obs: &RepObservation) -> Option<RepEvent>;

    fn count(&self) -> u32;

    /// Back to zero reps with no history
    fn reset(&mut self);

    /// Switch to the labels and angles of a newly loaded template
    fn adopt_template(&mut self, _template: &ExerciseTemplate) {}

    /// Back to the configured labels and angles after the template is dropped
    fn release_template(&mut self) {}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RepStrategyConfig {
    Sequence(SequenceConfig),
    Hysteresis(HysteresisConfig),
}

impl RepStrategyConfig {
    pub fn build(&self) -> Box<dyn RepetitionStrategy> {
        match self {
            RepStrategyConfig::Sequence(c) => Box::new(SequenceCounter::new(c.clone())),
            RepStrategyConfig::Hysteresis(c) => Box::new(HysteresisCounter::new(c.clone())),
        }
    }
}

impl Default for RepStrategyConfig {
    fn default() -> Self {
        RepStrategyConfig::Sequence(SequenceConfig::default())
    }
}
