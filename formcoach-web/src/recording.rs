//! Reference recording capture
//!
//! Runs reference frames through the same extraction and smoothing as a
//! live session and keeps the full series of every angle of interest for
//! the template learner.

use std::collections::BTreeMap;

use crate::classifier::ReferenceRecording;
use crate::config::ExerciseConfig;
use crate::physics::{
    AngleExtractor, AngleSeries, AngleVector, FilterBank, LandmarkFrame, MovementSegment,
    MovementSegmenter,
};

#[derive(Clone, Debug)]
pub struct ReferenceRecorder {
    exercise_name: String,
    exercise_type: String,
    angles_of_interest: Vec<String>,
    extractor: AngleExtractor,
    filters: FilterBank,
    segmenter: MovementSegmenter,
    series: BTreeMap<String, AngleSeries>,
    frames: usize,
}

impl ReferenceRecorder {
    pub fn new(config: &ExerciseConfig) -> Self {
        Self {
            exercise_name: config.exercise_name.clone(),
            exercise_type: config.exercise_type.clone(),
            angles_of_interest: config.angles_of_interest.clone(),
            extractor: AngleExtractor::new(config.angle_definitions.clone(), config.confidence_floor),
            filters: FilterBank::new(config.smoothing),
            segmenter: MovementSegmenter::new(config.segmentation),
            series: config
                .angles_of_interest
                .iter()
                .map(|name| (name.clone(), AngleSeries::new(name)))
                .collect(),
            frames: 0,
        }
    }

    pub fn push_frame(&mut self, frame: &LandmarkFrame) -> AngleVector {
        let extraction = self.extractor.extract(frame);
        self.push_angles(&extraction.angles)
    }

    /// Smooth raw angles and append those of interest. Returns the smoothed vector.
    pub fn push_angles(&mut self, raw: &AngleVector) -> AngleVector {
        let smoothed = self.filters.smooth(raw);
        for (name, series) in self.series.iter_mut() {
            if let Some(v) = smoothed.get(name) {
                series.push(smoothed.timestamp, v);
            }
        }
        self.frames += 1;
        smoothed
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn series(&self, name: &str) -> Option<&AngleSeries> {
        self.series.get(name)
    }

    /// Snapshot for the learner; recording can continue afterwards
    pub fn recording(&self) -> ReferenceRecording {
        ReferenceRecording {
            exercise_name: self.exercise_name.clone(),
            exercise_type: self.exercise_type.clone(),
            angles_of_interest: self.angles_of_interest.clone(),
            series: self.series.values().cloned().collect(),
        }
    }

    /// Sustained movements of every recorded angle, in angle-name order
    pub fn segment_summaries(&self) -> Vec<MovementSegment> {
        self.series
            .values()
            .flat_map(|s| self.segmenter.segment(s))
            .collect()
    }

    pub fn clear(&mut self) {
        self.filters.reset();
        for series in self.series.values_mut() {
            series.samples.clear();
        }
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knee_recorder() -> ReferenceRecorder {
        ReferenceRecorder::new(&ExerciseConfig::knee_extension())
    }

    #[test]
    fn test_only_angles_of_interest_recorded() {
        let mut r = knee_recorder();
        r.push_angles(&AngleVector::new(0.0).with("right_knee", 90.0).with("left_elbow", 30.0));
        r.push_angles(&AngleVector::new(0.1).with("right_knee", 92.0));

        let rec = r.recording();
        assert_eq!(r.frame_count(), 2);
        assert_eq!(rec.exercise_type, "knee_extension");
        assert_eq!(r.series("right_knee").unwrap().len(), 2);
        assert!(r.series("right_hip").unwrap().is_empty());
        assert!(r.series("left_elbow").is_none());
    }

    #[test]
    fn test_segments_and_clear() {
        let mut r = knee_recorder();
        // 90 -> 170 over 1s, hold, then back
        for i in 0..=60 {
            let t = i as f64 / 30.0;
            let v = if i <= 30 { 90.0 + 80.0 * t } else { 170.0 - 80.0 * (t - 1.0) };
            r.push_angles(&AngleVector::new(t).with("right_knee", v));
        }
        let segments = r.segment_summaries();
        assert!(!segments.is_empty());
        assert!(segments.iter().all(|s| s.angle_name == "right_knee"));
        assert!(segments[0].delta > 20.0);

        r.clear();
        assert_eq!(r.frame_count(), 0);
        assert!(r.series("right_knee").unwrap().is_empty());
    }
}
