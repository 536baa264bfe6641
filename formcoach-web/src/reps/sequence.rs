//! Discrete state-sequence rep counter
//!
//! A label must dwell for the debounce interval before it is accepted into
//! history. Once the newest accepted labels spell the rep sequence, one rep
//! is counted and history collapses to the final label so the next cycle
//! can start from it.

use serde::{Deserialize, Serialize};

use super::history::LabelHistory;
use super::strategy::{RepEvent, RepObservation, RepetitionStrategy};
use crate::classifier::ExerciseTemplate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SequenceConfig {
    /// Threshold-state labels of one rep, e.g. ["flexed", "extended", "flexed"].
    /// While a template is loaded its rep cycle is matched instead.
    pub sequence: Vec<String>,
    /// Dwell before a new label is accepted (seconds)
    pub debounce_s: f64,
    /// Minimum time between counted reps (seconds)
    pub cooldown_s: f64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            sequence: Vec::new(),
            debounce_s: 0.2,
            cooldown_s: 0.3,
        }
    }
}

#[derive(Clone, Debug)]
struct Candidate {
    label: String,
    since: f64,
}

#[derive(Clone, Debug)]
pub struct SequenceCounter {
    config: SequenceConfig,
    sequence: Vec<String>,
    history: LabelHistory,
    candidate: Option<Candidate>,
    count: u32,
    last_rep_time: Option<f64>,
}

impl SequenceCounter {
    pub fn new(config: SequenceConfig) -> Self {
        let sequence = config.sequence.clone();
        Self {
            history: LabelHistory::new(sequence.len() + 2),
            sequence,
            config,
            candidate: None,
            count: 0,
            last_rep_time: None,
        }
    }

    /// Labels currently matched against
    pub fn sequence(&self) -> &[String] {
        &self.sequence
    }

    /// Accepted labels, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.to_vec()
    }

    fn set_sequence(&mut self, sequence: Vec<String>) {
        self.history = LabelHistory::new(sequence.len() + 2);
        self.sequence = sequence;
        self.candidate = None;
    }

    fn accept(&mut self, label: &str, t: f64) -> Option<RepEvent> {
        if !self.history.push(label) || !self.history.ends_with(&self.sequence) {
            return None;
        }

        let cooled = self
            .last_rep_time
            .map_or(true, |last| t - last >= self.config.cooldown_s);
        if !cooled {
            log::debug!("sequence matched at {:.2}s inside cooldown, not counted", t);
            return None;
        }

        self.count += 1;
        self.last_rep_time = Some(t);
        self.history.collapse_to_last();
        log::info!("rep {} completed at {:.2}s (sequence)", self.count, t);

        Some(RepEvent {
            rep_number: self.count,
            timestamp: t,
            valid: true,
        })
    }
}

impl RepetitionStrategy for SequenceCounter {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn observe(&mut self, obs: &RepObservation) -> Option<RepEvent> {
        // Dropouts are skipped, not treated as a state change
        let label = obs.state?;

        if self.history.last() == Some(label) {
            self.candidate = None;
            return None;
        }

        let since = match &self.candidate {
            Some(c) if c.label == label => c.since,
            _ => {
                self.candidate = Some(Candidate {
                    label: label.to_string(),
                    since: obs.timestamp,
                });
                obs.timestamp
            }
        };

        if self.config.debounce_s > 0.0 && obs.timestamp - since < self.config.debounce_s {
            return None;
        }

        self.candidate = None;
        self.accept(label, obs.timestamp)
    }

    fn count(&self) -> u32 {
        self.count
    }

    fn reset(&mut self) {
        self.history.clear();
        self.candidate = None;
        self.count = 0;
        self.last_rep_time = None;
    }

    fn adopt_template(&mut self, template: &ExerciseTemplate) {
        let cycle = template.rep_cycle_names();
        log::debug!("sequence counter matching template cycle {:?}", cycle);
        self.set_sequence(cycle);
    }

    fn release_template(&mut self) {
        if self.sequence != self.config.sequence {
            log::debug!("sequence counter back to {:?}", self.config.sequence);
            self.set_sequence(self.config.sequence.clone());
        }
    }
}
