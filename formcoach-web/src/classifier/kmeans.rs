//! Lloyd's k-means over feature vectors
//!
//! Centroids start at K distinct points picked by the caller's RNG, so a
//! seeded RNG gives a reproducible clustering. Cancellation is checked
//! between iterations only.

use nalgebra::DVector;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::LearnError;

pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_TOLERANCE: f64 = 0.001;

#[derive(Clone, Copy, Debug)]
pub struct KMeans {
    pub k: usize,
    pub max_iterations: usize,
    /// Stop once no centroid coordinate moves more than this
    pub tolerance: f64,
}

#[derive(Clone, Debug)]
pub struct Clustering {
    pub centroids: Vec<DVector<f64>>,
    /// Cluster index per input point, nearest to the final centroids
    pub assignments: Vec<usize>,
    pub iterations: usize,
    pub converged: bool,
}

impl Clustering {
    pub fn members(&self, cluster: usize) -> impl Iterator<Item = usize> + '_ {
        self.assignments
            .iter()
            .enumerate()
            .filter(move |(_, &c)| c == cluster)
            .map(|(i, _)| i)
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &c in &self.assignments {
            sizes[c] += 1;
        }
        sizes
    }
}

/// Index of the closest centroid; ties go to the lower index
pub fn nearest_centroid(point: &DVector<f64>, centroids: &[DVector<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = (point - c).norm_squared();
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn fit<R: Rng + ?Sized>(
        &self,
        points: &[DVector<f64>],
        rng: &mut R,
    ) -> Result<Clustering, LearnError> {
        self.fit_with_cancel(points, rng, || false)
    }

    pub fn fit_with_cancel<R, C>(
        &self,
        points: &[DVector<f64>],
        rng: &mut R,
        mut cancelled: C,
    ) -> Result<Clustering, LearnError>
    where
        R: Rng + ?Sized,
        C: FnMut() -> bool,
    {
        if self.k == 0 {
            return Err(LearnError::insufficient("cluster count must be positive"));
        }
        let mut centroids = self.initial_centroids(points, rng)?;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            if cancelled() {
                return Err(LearnError::Cancelled { iterations });
            }

            let assignments = assign(points, &centroids);

            // Empty clusters keep their previous centroid
            let dim = centroids[0].len();
            let mut sums = vec![DVector::<f64>::zeros(dim); self.k];
            let mut counts = vec![0usize; self.k];
            for (p, &c) in points.iter().zip(&assignments) {
                sums[c] += p;
                counts[c] += 1;
            }

            let mut shift: f64 = 0.0;
            for (c, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
                if count == 0 {
                    continue;
                }
                let updated = sum / count as f64;
                shift = shift.max((&updated - &centroids[c]).amax());
                centroids[c] = updated;
            }

            iterations += 1;
            if shift <= self.tolerance {
                converged = true;
                break;
            }
        }

        let assignments = assign(points, &centroids);
        log::debug!(
            "k-means k={} finished after {} iterations (converged: {})",
            self.k,
            iterations,
            converged
        );

        Ok(Clustering {
            centroids,
            assignments,
            iterations,
            converged,
        })
    }

    /// K distinct points in random order
    fn initial_centroids<R: Rng + ?Sized>(
        &self,
        points: &[DVector<f64>],
        rng: &mut R,
    ) -> Result<Vec<DVector<f64>>, LearnError> {
        let mut order: Vec<usize> = (0..points.len()).collect();
        order.shuffle(rng);

        let mut chosen: Vec<DVector<f64>> = Vec::with_capacity(self.k);
        for i in order {
            if chosen.iter().all(|c| c != &points[i]) {
                chosen.push(points[i].clone());
                if chosen.len() == self.k {
                    return Ok(chosen);
                }
            }
        }

        Err(LearnError::insufficient(format!(
            "need {} distinct feature vectors, found {}",
            self.k,
            chosen.len()
        )))
    }
}

fn assign(points: &[DVector<f64>], centroids: &[DVector<f64>]) -> Vec<usize> {
    points.iter().map(|p| nearest_centroid(p, centroids)).collect()
}
