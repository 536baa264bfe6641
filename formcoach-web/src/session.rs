//! Live tracking session
//!
//! One instance per performer. Owns every piece of per-frame mutable state:
//! the filter bank, the rep counter and the error history. The template is
//! shared read-only and swapped by replacing the `Arc`.
//!
//! Per frame: extract -> smooth -> label -> count -> score (on a counted rep).
//! The counter matches template state names while a template is loaded and
//! threshold-state names otherwise.

use std::sync::Arc;

use serde::Serialize;

use crate::classifier::{ExerciseTemplate, StateClassifier, StateId, StateMatch, ThresholdClassifier};
use crate::config::ExerciseConfig;
use crate::error::{ConfigError, SessionError};
use crate::physics::{AngleExtractor, AngleVector, FilterBank, LandmarkFrame};
use crate::reps::{RepEvent, RepObservation, RepetitionStrategy};
use crate::scoring::{RepError, RepErrorScorer, RepErrorSummary};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    Template,
    Threshold,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateLabel {
    pub name: String,
    pub source: LabelSource,
    pub state_id: Option<StateId>,
    pub distance: Option<f64>,
}

impl From<StateMatch> for StateLabel {
    fn from(m: StateMatch) -> Self {
        Self {
            name: m.state_name,
            source: LabelSource::Template,
            state_id: Some(m.state_id),
            distance: Some(m.distance),
        }
    }
}

/// Everything the caller needs to render one frame
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOutput {
    pub timestamp: f64,
    /// Smoothed angles
    pub angles: AngleVector,
    /// Angles skipped this frame for missing or low-confidence landmarks
    pub skipped_angles: Vec<String>,
    pub state: Option<StateLabel>,
    pub rep_count: u32,
    /// Set only on the frame a cycle completed
    pub rep_event: Option<RepEvent>,
    pub rep_error: Option<RepError>,
    pub summary: Option<RepErrorSummary>,
}

#[derive(Debug)]
pub struct ExerciseSession {
    config: ExerciseConfig,
    extractor: AngleExtractor,
    filters: FilterBank,
    thresholds: ThresholdClassifier,
    classifier: Option<StateClassifier>,
    counter: Box<dyn RepetitionStrategy>,
    scorer: RepErrorScorer,
    latest: Option<AngleVector>,
}

impl ExerciseSession {
    pub fn new(config: ExerciseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            extractor: AngleExtractor::new(config.angle_definitions.clone(), config.confidence_floor),
            filters: FilterBank::new(config.smoothing),
            thresholds: ThresholdClassifier::new(config.threshold_states.clone()),
            classifier: None,
            counter: config.rep_strategy.build(),
            scorer: RepErrorScorer::new(config.scoring.clone()),
            latest: None,
            config,
        })
    }

    pub fn config(&self) -> &ExerciseConfig {
        &self.config
    }

    pub fn rep_count(&self) -> u32 {
        self.counter.count()
    }

    pub fn latest_angles(&self) -> Option<&AngleVector> {
        self.latest.as_ref()
    }

    pub fn template(&self) -> Option<&Arc<ExerciseTemplate>> {
        self.classifier.as_ref().map(StateClassifier::template)
    }

    pub fn rep_errors(&self) -> &[RepError] {
        self.scorer.errors()
    }

    pub fn summary(&self) -> Option<&RepErrorSummary> {
        self.scorer.summary()
    }

    /// Swap in a template. Rejects templates learned for another exercise type.
    pub fn set_template(&mut self, template: Arc<ExerciseTemplate>) -> Result<(), SessionError> {
        if template.exercise_type != self.config.exercise_type {
            return Err(SessionError::TemplateMismatch {
                expected: self.config.exercise_type.clone(),
                found: template.exercise_type.clone(),
            });
        }
        self.counter.adopt_template(&template);
        log::info!(
            "template '{}' loaded ({} states)",
            template.exercise_name,
            template.states.len()
        );
        self.classifier = Some(StateClassifier::new(template));
        Ok(())
    }

    /// Drop the template and fall back to threshold states
    pub fn clear_template(&mut self) {
        if self.classifier.take().is_some() {
            self.counter.release_template();
            log::info!("template cleared, using threshold states");
        }
    }

    /// Template-relative classification
    pub fn classify(&self, angles: &AngleVector) -> Result<Option<StateMatch>, SessionError> {
        self.classifier
            .as_ref()
            .map(|c| c.classify(angles))
            .ok_or(SessionError::NoTemplateLoaded)
    }

    /// Template match when one is loaded, otherwise the threshold bands
    fn resolve_state(&self, angles: &AngleVector) -> Option<StateLabel> {
        match self.classify(angles) {
            Ok(m) => m.map(StateLabel::from),
            Err(SessionError::NoTemplateLoaded) => {
                self.thresholds.classify(angles).map(|name| StateLabel {
                    name: name.to_string(),
                    source: LabelSource::Threshold,
                    state_id: None,
                    distance: None,
                })
            }
            Err(_) => None,
        }
    }

    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> FrameOutput {
        let extraction = self.extractor.extract(frame);
        let mut out = self.process_angles(&extraction.angles);
        out.skipped_angles = extraction.missing.into_iter().map(|m| m.angle).collect();
        out
    }

    /// Run already-extracted raw angles through the rest of the pipeline
    pub fn process_angles(&mut self, raw: &AngleVector) -> FrameOutput {
        let angles = self.filters.smooth(raw);
        let state = self.resolve_state(&angles);

        let rep_event = self.counter.observe(&RepObservation {
            timestamp: angles.timestamp,
            state: state.as_ref().map(|s| s.name.as_str()),
            angles: &angles,
        });

        if let (Some(event), Some(classifier)) = (rep_event.as_ref(), self.classifier.as_ref()) {
            self.scorer.record(event, &angles, classifier);
        }

        self.latest = Some(angles.clone());
        FrameOutput {
            timestamp: angles.timestamp,
            angles,
            skipped_angles: Vec::new(),
            state,
            rep_count: self.counter.count(),
            rep_event,
            rep_error: self.scorer.last().cloned(),
            summary: self.scorer.summary().cloned(),
        }
    }

    /// Forget filter history, count and errors. The template stays loaded.
    pub fn reset(&mut self) {
        self.filters.reset();
        self.counter.reset();
        self.scorer.reset();
        self.latest = None;
        log::info!("session for '{}' reset", self.config.exercise_type);
    }
}
