//! Classifier module - template learning and live state matching
//!
//! Learning is a one-shot batch over a reference recording. Live matching
//! reads the resulting template through an `Arc` and never mutates it.

mod features;
mod kmeans;
pub(crate) mod template;
mod learner;
mod live;
mod thresholds;

pub use features::{FeatureFrame, FeatureMatrix, DEFAULT_QUANTUM_S};
pub use kmeans::{nearest_centroid, Clustering, KMeans, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
pub use template::{
    AngleChange, AngleStats, ExerciseTemplate, LearnedState, Occurrence, StateId,
    StateTransition,
};
pub use learner::{LearnOutcome, LearnerConfig, ReferenceRecording, TemplateLearner};
pub use live::{StateClassifier, StateMatch, DEFAULT_SCALE_FLOOR};
pub use thresholds::{ThresholdClassifier, ThresholdState};
