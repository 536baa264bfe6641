//! Reps module - repetition counting strategies
//!
//! Re-exports only. All logic in submodules.

mod history;
mod strategy;
mod sequence;
mod hysteresis;

pub use history::LabelHistory;
pub use strategy::{RepEvent, RepObservation, RepStrategyConfig, RepetitionStrategy};
pub use sequence::{SequenceConfig, SequenceCounter};
pub use hysteresis::{Direction, HysteresisConfig, HysteresisCounter};
