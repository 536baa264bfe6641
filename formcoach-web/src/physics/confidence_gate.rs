//! Confidence Gate - first check before any angle math
//!
//! A landmark below the visibility floor is treated exactly like a missing
//! one: the angle that needs it is skipped for that frame.

use super::landmarks::{Landmark, LandmarkFrame, PoseLandmark};
use crate::error::MissReason;

/// Default minimum visibility to accept a landmark
pub const DEFAULT_CONFIDENCE_FLOOR: f32 = 0.5;

/// Visibility gate for landmark lookups
#[derive(Clone, Copy, Debug)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Fetch a landmark if present and confident enough
    pub fn admit<'a>(
        &self,
        frame: &'a LandmarkFrame,
        id: PoseLandmark,
    ) -> Result<&'a Landmark, MissReason> {
        let landmark = frame.get(id).ok_or(MissReason::Absent)?;
        if landmark.visibility < self.threshold || !landmark.visibility.is_finite() {
            return Err(MissReason::LowConfidence(landmark.visibility));
        }
        Ok(landmark)
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_FLOOR)
    }
}
