//! Template learning from one reference recording
//!
//! 1. Snap every angle of interest onto a common timeline (features.rs)
//! 2. K = clamp(frames / 30, 2, 4), then Lloyd's k-means (kmeans.rs)
//! 3. Each non-empty cluster becomes a state: per-angle stats, occurrence
//!    intervals, representative timestamp
//! 4. States ordered by first appearance; transitions and the canonical
//!    sequence read off the merged occurrence timeline
//!
//! The result is only returned complete. Errors abort this one call.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::features::{FeatureFrame, FeatureMatrix, DEFAULT_QUANTUM_S};
use super::kmeans::{Clustering, KMeans, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use super::template::{
    AngleChange, AngleStats, ExerciseTemplate, LearnedState, Occurrence, StateId,
    StateTransition,
};
use crate::error::{LearnError, LearnWarning};
use crate::physics::AngleSeries;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearnerConfig {
    /// Average frames each state should have when choosing K
    pub frames_per_state: usize,
    pub min_states: usize,
    pub max_states: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Member timestamps closer than this belong to one occurrence (seconds)
    pub occurrence_gap_s: f64,
    /// Timeline resolution (seconds)
    pub quantum_s: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            frames_per_state: 30,
            min_states: 2,
            max_states: 4,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            occurrence_gap_s: 0.1,
            quantum_s: DEFAULT_QUANTUM_S,
        }
    }
}

/// Everything the learner needs from one reference performance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecording {
    pub exercise_name: String,
    pub exercise_type: String,
    pub angles_of_interest: Vec<String>,
    pub series: Vec<AngleSeries>,
}

#[derive(Clone, Debug)]
pub struct LearnOutcome {
    pub template: ExerciseTemplate,
    pub warnings: Vec<LearnWarning>,
    pub iterations: usize,
}

/// A state before ids are assigned
struct StateDraft {
    angle_stats: BTreeMap<String, AngleStats>,
    occurrences: Vec<Occurrence>,
    representative_timestamp: f64,
}

#[derive(Clone, Debug, Default)]
pub struct TemplateLearner {
    config: LearnerConfig,
}

impl TemplateLearner {
    pub fn new(config: LearnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// At least `frames_per_state` frames per state on average, within bounds
    pub fn choose_k(&self, frame_count: usize) -> usize {
        let per_state = self.config.frames_per_state.max(1);
        (frame_count / per_state).clamp(self.config.min_states, self.config.max_states)
    }

    pub fn learn<R: Rng + ?Sized>(
        &self,
        recording: &ReferenceRecording,
        rng: &mut R,
    ) -> Result<LearnOutcome, LearnError> {
        self.learn_with_cancel(recording, rng, || false)
    }

    pub fn learn_with_cancel<R, C>(
        &self,
        recording: &ReferenceRecording,
        rng: &mut R,
        cancelled: C,
    ) -> Result<LearnOutcome, LearnError>
    where
        R: Rng + ?Sized,
        C: FnMut() -> bool,
    {
        let result = self.learn_inner(recording, rng, cancelled);
        if let Err(LearnError::InsufficientData { reason }) = &result {
            log::warn!("template learning for '{}' failed: {}", recording.exercise_name, reason);
        }
        result
    }

    fn learn_inner<R, C>(
        &self,
        recording: &ReferenceRecording,
        rng: &mut R,
        cancelled: C,
    ) -> Result<LearnOutcome, LearnError>
    where
        R: Rng + ?Sized,
        C: FnMut() -> bool,
    {
        if recording.angles_of_interest.is_empty() {
            return Err(LearnError::insufficient("no angles of interest configured"));
        }

        let matrix = FeatureMatrix::build(
            &recording.series,
            &recording.angles_of_interest,
            self.config.quantum_s,
        );
        if matrix.len() < 2 {
            return Err(LearnError::insufficient(format!(
                "need at least 2 frames, found {}",
                matrix.len()
            )));
        }

        let k = self.choose_k(matrix.len());
        let distinct = matrix.distinct_count();
        if distinct < k {
            return Err(LearnError::insufficient(format!(
                "need {k} distinct feature vectors for {k} states, found {distinct}"
            )));
        }

        let kmeans = KMeans {
            k,
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
        };
        let clustering = kmeans.fit_with_cancel(&matrix.vectors(), rng, cancelled)?;
        let (template, warnings) = self.build_template(recording, &matrix, &clustering)?;
        log::info!(
            "learned template '{}': {} states (k={}), {} reps, confidence {:.1}",
            template.exercise_name,
            template.states.len(),
            k,
            template.recommended_reps,
            template.confidence_score
        );

        Ok(LearnOutcome {
            template,
            warnings,
            iterations: clustering.iterations,
        })
    }

    /// Turn a finished clustering into a template. Empty clusters are dropped
    /// with a warning; fewer than two surviving states is an error.
    fn build_template(
        &self,
        recording: &ReferenceRecording,
        matrix: &FeatureMatrix,
        clustering: &Clustering,
    ) -> Result<(ExerciseTemplate, Vec<LearnWarning>), LearnError> {
        let mut warnings = Vec::new();
        let mut drafts = Vec::with_capacity(clustering.centroids.len());
        for cluster in 0..clustering.centroids.len() {
            let members: Vec<&FeatureFrame> =
                clustering.members(cluster).map(|i| &matrix.frames[i]).collect();
            if members.is_empty() {
                log::warn!("cluster {} received no members and was dropped", cluster);
                warnings.push(LearnWarning::EmptyCluster { cluster });
                continue;
            }
            drafts.push(self.draft_state(matrix, &members));
        }

        if drafts.len() < 2 {
            return Err(LearnError::insufficient(format!(
                "only {} non-empty states after clustering",
                drafts.len()
            )));
        }

        Ok((self.assemble(recording, matrix, drafts), warnings))
    }

    fn draft_state(&self, matrix: &FeatureMatrix, members: &[&FeatureFrame]) -> StateDraft {
        let mut angle_stats = BTreeMap::new();
        for (slot, name) in matrix.angle_names.iter().enumerate() {
            let values: Vec<f64> = members
                .iter()
                .filter(|f| f.present[slot])
                .map(|f| f.vector[slot])
                .collect();
            if let Some(stats) = AngleStats::from_values(&values) {
                angle_stats.insert(name.clone(), stats);
            }
        }

        let occurrences = self.occurrences(members);
        let representative_timestamp = occurrences
            .iter()
            .fold(None::<&Occurrence>, |best, o| match best {
                Some(b) if b.duration() >= o.duration() => Some(b),
                _ => Some(o),
            })
            .map(Occurrence::midpoint)
            .unwrap_or_default();

        StateDraft {
            angle_stats,
            occurrences,
            representative_timestamp,
        }
    }

    /// Merge time-ordered member frames into intervals split at gaps
    fn occurrences(&self, members: &[&FeatureFrame]) -> Vec<Occurrence> {
        let gap_ticks = (self.config.occurrence_gap_s / self.config.quantum_s).round() as i64;
        let mut out: Vec<Occurrence> = Vec::new();
        let mut last_tick: Option<i64> = None;

        for frame in members {
            match (last_tick, out.last_mut()) {
                (Some(prev), Some(current)) if frame.tick - prev < gap_ticks => {
                    current.end_time = frame.timestamp;
                }
                _ => out.push(Occurrence {
                    start_time: frame.timestamp,
                    end_time: frame.timestamp,
                }),
            }
            last_tick = Some(frame.tick);
        }
        out
    }

    fn assemble(
        &self,
        recording: &ReferenceRecording,
        matrix: &FeatureMatrix,
        mut drafts: Vec<StateDraft>,
    ) -> ExerciseTemplate {
        drafts.sort_by(|a, b| {
            let sa = a.occurrences.first().map_or(f64::INFINITY, |o| o.start_time);
            let sb = b.occurrences.first().map_or(f64::INFINITY, |o| o.start_time);
            sa.total_cmp(&sb)
        });

        let states: Vec<LearnedState> = drafts
            .into_iter()
            .enumerate()
            .map(|(i, d)| LearnedState {
                id: i as StateId,
                name: format!("state_{}", i + 1),
                angle_stats: d.angle_stats,
                occurrences: d.occurrences,
                representative_timestamp: d.representative_timestamp,
            })
            .collect();

        // Chronological boundaries of every occurrence of every state
        let mut timeline: Vec<(Occurrence, StateId)> = states
            .iter()
            .flat_map(|s| s.occurrences.iter().map(move |o| (*o, s.id)))
            .collect();
        timeline.sort_by(|a, b| {
            a.0.start_time
                .total_cmp(&b.0.start_time)
                .then(a.1.cmp(&b.1))
        });

        let transitions = timeline
            .windows(2)
            .filter(|w| w[0].1 != w[1].1)
            .map(|w| transition(&states, w[0], w[1]))
            .collect();

        let mut canonical_state_sequence: Vec<StateId> = timeline.iter().map(|(_, id)| *id).collect();
        canonical_state_sequence.dedup();

        let total_occurrences: usize = states.iter().map(|s| s.occurrences.len()).sum();
        let avg_occurrences = total_occurrences as f64 / states.len() as f64;
        let recommended_reps = avg_occurrences.floor().max(1.0) as u32;

        ExerciseTemplate {
            exercise_name: recording.exercise_name.clone(),
            exercise_type: recording.exercise_type.clone(),
            confidence_score: confidence_score(&states, avg_occurrences),
            states,
            transitions,
            canonical_state_sequence,
            total_duration_seconds: matrix.duration(),
            recommended_reps,
        }
    }
}

fn transition(
    states: &[LearnedState],
    from: (Occurrence, StateId),
    to: (Occurrence, StateId),
) -> StateTransition {
    let a = &states[from.1 as usize];
    let b = &states[to.1 as usize];
    let angle_changes = a
        .angle_stats
        .iter()
        .filter_map(|(name, sa)| {
            b.angle_stats.get(name).map(|sb| {
                (
                    name.clone(),
                    AngleChange {
                        start_angle: sa.mean,
                        end_angle: sb.mean,
                        delta: sb.mean - sa.mean,
                    },
                )
            })
        })
        .collect();

    StateTransition {
        from_state_id: a.id,
        to_state_id: b.id,
        duration_seconds: (to.0.start_time - from.0.end_time).max(0.0),
        angle_changes,
    }
}

/// Tight states and many repeats raise confidence.
///
/// 60% consistency: 100 / (1 + avgStd / 10), so 10° average spread halves it.
/// 40% repetition: 10 points per average occurrence, capped at 10.
fn confidence_score(states: &[LearnedState], avg_occurrences: f64) -> f64 {
    let per_state: Vec<f64> = states
        .iter()
        .filter(|s| !s.angle_stats.is_empty())
        .map(|s| {
            s.angle_stats.values().map(|a| a.std_dev).sum::<f64>() / s.angle_stats.len() as f64
        })
        .collect();
    let avg_std = if per_state.is_empty() {
        0.0
    } else {
        per_state.iter().sum::<f64>() / per_state.len() as f64
    };

    let consistency = 100.0 / (1.0 + avg_std / 10.0);
    let repetition = avg_occurrences.min(10.0) * 10.0;
    (0.6 * consistency + 0.4 * repetition).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Square wave: `cycles` × (low for `half` s, high for `half` s)
    fn square_wave(name: &str, low: f64, high: f64, cycles: usize, half: f64, dt: f64) -> AngleSeries {
        let total = (cycles as f64 * 2.0 * half / dt).round() as usize;
        let points = (0..total).map(|i| {
            let t = i as f64 * dt;
            let phase = ((t + 1e-9) / half).floor() as usize % 2;
            let jitter = ((i * 7) % 5) as f64 - 2.0;
            (t, if phase == 0 { low } else { high } + jitter)
        });
        AngleSeries::from_points(name, points)
    }

    fn recording(series: Vec<AngleSeries>, angles: &[&str]) -> ReferenceRecording {
        ReferenceRecording {
            exercise_name: "Knee extension".to_string(),
            exercise_type: "knee_extension".to_string(),
            angles_of_interest: angles.iter().map(|s| s.to_string()).collect(),
            series,
        }
    }

    #[test]
    fn test_choose_k_bounds() {
        let l = TemplateLearner::default();
        assert_eq!(l.choose_k(2), 2);
        assert_eq!(l.choose_k(89), 2);
        assert_eq!(l.choose_k(90), 3);
        assert_eq!(l.choose_k(10_000), 4);
    }

    #[test]
    fn test_two_state_square_wave() {
        let rec = recording(vec![square_wave("right_knee", 90.0, 170.0, 4, 0.8, 0.08)], &["right_knee"]);
        let out = TemplateLearner::default()
            .learn(&rec, &mut StdRng::seed_from_u64(11))
            .unwrap();
        let t = out.template;

        assert_eq!(t.states.len(), 2);
        assert!(out.warnings.is_empty());
        assert!(t.validate().is_ok());

        // First state is the one the recording starts in
        let bent = &t.states[0].angle_stats["right_knee"];
        let straight = &t.states[1].angle_stats["right_knee"];
        assert!((bent.mean - 90.0).abs() < 2.0);
        assert!((straight.mean - 170.0).abs() < 2.0);
        assert!(bent.max < straight.min);

        assert_eq!(t.states[0].occurrences.len(), 4);
        assert_eq!(t.states[1].occurrences.len(), 4);
        assert_eq!(t.recommended_reps, 4);
        assert_eq!(t.canonical_state_sequence, vec![0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(t.transitions.len(), 7);
        assert_abs_diff_eq!(
            t.transitions[0].angle_changes["right_knee"].delta,
            straight.mean - bent.mean,
            epsilon = 1e-9
        );
        assert!(t.confidence_score > 0.0 && t.confidence_score <= 100.0);
    }

    #[test]
    fn test_representative_is_midpoint_of_longest_occurrence() {
        let rec = recording(vec![square_wave("right_knee", 90.0, 170.0, 4, 0.8, 0.08)], &["right_knee"]);
        let t = TemplateLearner::default()
            .learn(&rec, &mut StdRng::seed_from_u64(5))
            .unwrap()
            .template;
        let s = &t.states[0];
        let longest = s
            .occurrences
            .iter()
            .map(|o| o.duration())
            .fold(0.0, f64::max);
        assert!(s
            .occurrences
            .iter()
            .any(|o| (o.duration() - longest).abs() < 1e-9
                && (o.midpoint() - s.representative_timestamp).abs() < 1e-9));
    }

    #[test]
    fn test_too_few_frames() {
        let rec = recording(vec![AngleSeries::from_points("right_knee", vec![(0.0, 90.0)])], &["right_knee"]);
        let err = TemplateLearner::default()
            .learn(&rec, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, LearnError::InsufficientData { .. }));
    }

    #[test]
    fn test_constant_signal_is_insufficient() {
        let series = AngleSeries::from_points("right_knee", (0..60).map(|i| (i as f64 * 0.05, 120.0)));
        let err = TemplateLearner::default()
            .learn(&recording(vec![series], &["right_knee"]), &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, LearnError::InsufficientData { .. }));
    }

    #[test]
    fn test_occurrences_split_on_gap() {
        let learner = TemplateLearner::default();
        let frames: Vec<FeatureFrame> = [0i64, 3, 6, 30, 33]
            .iter()
            .map(|&tick| FeatureFrame {
                tick,
                timestamp: tick as f64 * 0.01,
                vector: nalgebra::DVector::from_vec(vec![1.0]),
                present: vec![true],
            })
            .collect();
        let refs: Vec<&FeatureFrame> = frames.iter().collect();
        let occ = learner.occurrences(&refs);
        assert_eq!(occ.len(), 2);
        assert_abs_diff_eq!(occ[0].end_time, 0.06, epsilon = 1e-12);
        assert_abs_diff_eq!(occ[1].start_time, 0.30, epsilon = 1e-12);
    }

    /// Three low frames then three high ones, one knee angle
    fn two_level_matrix() -> FeatureMatrix {
        let series = AngleSeries::from_points(
            "right_knee",
            [(0.0, 90.0), (0.05, 91.0), (0.1, 89.0), (0.15, 170.0), (0.2, 171.0), (0.25, 169.0)],
        );
        FeatureMatrix::build(&[series], &["right_knee".to_string()], DEFAULT_QUANTUM_S)
    }

    fn clustering(matrix: &FeatureMatrix, centroids: &[f64], assignments: Vec<usize>) -> Clustering {
        assert_eq!(assignments.len(), matrix.len());
        Clustering {
            centroids: centroids
                .iter()
                .map(|&c| nalgebra::DVector::from_vec(vec![c]))
                .collect(),
            assignments,
            iterations: 1,
            converged: true,
        }
    }

    #[test]
    fn test_empty_cluster_dropped_with_warning() {
        let matrix = two_level_matrix();
        let rec = recording(Vec::new(), &["right_knee"]);
        // Middle centroid attracted nothing
        let c = clustering(&matrix, &[90.0, 130.0, 170.0], vec![0, 0, 0, 2, 2, 2]);

        let (t, warnings) = TemplateLearner::default()
            .build_template(&rec, &matrix, &c)
            .unwrap();
        assert_eq!(warnings, vec![LearnWarning::EmptyCluster { cluster: 1 }]);
        assert_eq!(t.states.len(), 2);
        assert_eq!(t.states[1].name, "state_2");
        assert_abs_diff_eq!(t.states[1].angle_stats["right_knee"].mean, 170.0, epsilon = 1e-9);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_single_surviving_cluster_is_insufficient() {
        let matrix = two_level_matrix();
        let rec = recording(Vec::new(), &["right_knee"]);
        let c = clustering(&matrix, &[130.0, 300.0], vec![0; 6]);

        let err = TemplateLearner::default()
            .build_template(&rec, &matrix, &c)
            .unwrap_err();
        assert!(matches!(err, LearnError::InsufficientData { .. }));
    }

    #[test]
    fn test_recommended_reps_floors_average() {
        // Low level appears 4 times, high level 5 times: average 4.5
        let mut points = Vec::new();
        for i in 0..5 {
            let (lo, hi) = (i as f64 * 0.4, i as f64 * 0.4 + 0.2);
            if i < 4 {
                points.push((lo, 90.0));
            }
            points.push((hi, 170.0));
        }
        let series = AngleSeries::from_points("right_knee", points);
        let matrix = FeatureMatrix::build(&[series], &["right_knee".to_string()], DEFAULT_QUANTUM_S);
        let assignments = matrix
            .frames
            .iter()
            .map(|f| usize::from(f.vector[0] > 130.0))
            .collect();
        let c = clustering(&matrix, &[90.0, 170.0], assignments);

        let (t, _) = TemplateLearner::default()
            .build_template(&recording(Vec::new(), &["right_knee"]), &matrix, &c)
            .unwrap();
        assert_eq!(t.states[0].occurrences.len() + t.states[1].occurrences.len(), 9);
        assert_eq!(t.recommended_reps, 4);
    }

    #[test]
    fn test_confidence_prefers_tight_states() {
        use crate::classifier::template::tests::state;
        let tight = vec![state(0, "a", &[("k", 90.0, 1.0)]), state(1, "b", &[("k", 170.0, 1.0)])];
        let loose = vec![state(0, "a", &[("k", 90.0, 15.0)]), state(1, "b", &[("k", 170.0, 15.0)])];
        assert!(confidence_score(&tight, 4.0) > confidence_score(&loose, 4.0));
        assert!(confidence_score(&tight, 6.0) > confidence_score(&tight, 2.0));
        assert!(confidence_score(&tight, 100.0) <= 100.0);
    }
}
