//! Scoring module - per-rep form error and session summary
//!
//! Re-exports only. All logic in submodules.

mod rep_error;
mod summary;

pub use rep_error::{score_rep, AngleError, RepError, RepErrorScorer, ScoringConfig};
pub use summary::{ErrorTrend, RepErrorSummary};
