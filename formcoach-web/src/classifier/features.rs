//! Feature vectors for template learning
//!
//! Per-angle samples are snapped onto a common timeline (timestamps rounded
//! to the quantum) and grouped into frames. Each frame becomes one fixed-width
//! vector, one slot per tracked angle in the order given. A slot with no
//! sample reads 0.0; `present` records which slots were real.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::DVector;

use crate::physics::AngleSeries;

/// Default timeline resolution (seconds)
pub const DEFAULT_QUANTUM_S: f64 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureFrame {
    /// Timestamp in quantum units
    pub tick: i64,
    pub timestamp: f64,
    pub vector: DVector<f64>,
    pub present: Vec<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    pub angle_names: Vec<String>,
    pub frames: Vec<FeatureFrame>,
}

impl FeatureMatrix {
    /// Build frames from any series whose name is in `angle_names`
    pub fn build(series: &[AngleSeries], angle_names: &[String], quantum: f64) -> Self {
        let width = angle_names.len();
        let slot_of: BTreeMap<&str, usize> = angle_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let mut slots: BTreeMap<i64, (Vec<f64>, Vec<bool>)> = BTreeMap::new();
        for s in series {
            let Some(&slot) = slot_of.get(s.name.as_str()) else {
                continue;
            };
            for (t, v) in s.points() {
                if !t.is_finite() || !v.is_finite() {
                    continue;
                }
                let key = (t / quantum).round() as i64;
                let (values, present) = slots
                    .entry(key)
                    .or_insert_with(|| (vec![0.0; width], vec![false; width]));
                values[slot] = v;
                present[slot] = true;
            }
        }

        let frames = slots
            .into_iter()
            .map(|(key, (values, present))| FeatureFrame {
                tick: key,
                timestamp: key as f64 * quantum,
                vector: DVector::from_vec(values),
                present,
            })
            .collect();

        Self {
            angle_names: angle_names.to_vec(),
            frames,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn vectors(&self) -> Vec<DVector<f64>> {
        self.frames.iter().map(|f| f.vector.clone()).collect()
    }

    /// Number of bitwise-distinct feature vectors
    pub fn distinct_count(&self) -> usize {
        self.frames
            .iter()
            .map(|f| f.vector.iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn duration(&self) -> f64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(a), Some(b)) => b.timestamp - a.timestamp,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_samples_snap_to_common_frames() {
        let knee = AngleSeries::from_points("knee", vec![(0.0, 90.0), (0.0333, 95.0)]);
        let hip = AngleSeries::from_points("hip", vec![(0.001, 120.0), (0.0331, 121.0)]);
        let m = FeatureMatrix::build(&[knee, hip], &names(&["knee", "hip"]), DEFAULT_QUANTUM_S);

        assert_eq!(m.len(), 2);
        assert_abs_diff_eq!(m.frames[1].timestamp, 0.03, epsilon = 1e-12);
        assert_eq!(m.frames[0].vector.as_slice(), &[90.0, 120.0]);
        assert_eq!(m.frames[1].vector.as_slice(), &[95.0, 121.0]);
    }

    #[test]
    fn test_missing_angle_defaults_to_zero() {
        let knee = AngleSeries::from_points("knee", vec![(0.0, 90.0), (0.1, 91.0)]);
        let hip = AngleSeries::from_points("hip", vec![(0.0, 120.0)]);
        let m = FeatureMatrix::build(&[knee, hip], &names(&["knee", "hip"]), DEFAULT_QUANTUM_S);

        assert_eq!(m.frames[1].vector.len(), 2);
        assert_eq!(m.frames[1].vector[1], 0.0);
        assert_eq!(m.frames[1].present, vec![true, false]);
    }

    #[test]
    fn test_untracked_series_ignored_and_distinct_count() {
        let knee = AngleSeries::from_points("knee", vec![(0.0, 90.0), (0.1, 90.0), (0.2, 170.0)]);
        let elbow = AngleSeries::from_points("elbow", vec![(0.0, 10.0)]);
        let m = FeatureMatrix::build(&[knee, elbow], &names(&["knee"]), DEFAULT_QUANTUM_S);
        assert_eq!(m.angle_names, names(&["knee"]));
        assert_eq!(m.len(), 3);
        assert_eq!(m.distinct_count(), 2);
        assert_abs_diff_eq!(m.duration(), 0.2, epsilon = 1e-12);
    }
}
