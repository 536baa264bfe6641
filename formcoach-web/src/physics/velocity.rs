//! Angular velocity tracking with dead zone
//!
//! Finite-difference rate of one angle, smoothed with an EMA. Rates inside
//! the dead zone are reported as zero so callers can keep their previous
//! direction.

/// Default EMA weight of the newest rate
pub const DEFAULT_RATE_ALPHA: f64 = 0.5;

/// Smoothed derivative of one angle signal (degrees/second)
#[derive(Clone, Debug)]
pub struct AngularVelocity {
    alpha: f64,
    dead_zone: f64,
    last: Option<(f64, f64)>,
    smoothed: Option<f64>,
}

impl AngularVelocity {
    pub fn new(alpha: f64, dead_zone: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            dead_zone: dead_zone.abs(),
            last: None,
            smoothed: None,
        }
    }

    /// Update with a new sample. Returns the smoothed rate once two samples
    /// with increasing timestamps have been seen.
    pub fn update(&mut self, t: f64, value: f64) -> Option<f64> {
        let Some((t_prev, v_prev)) = self.last else {
            self.last = Some((t, value));
            return None;
        };

        let dt = t - t_prev;
        if dt <= 0.0 {
            return self.smoothed;
        }
        self.last = Some((t, value));

        let raw = (value - v_prev) / dt;
        let rate = match self.smoothed {
            Some(prev) => self.alpha * raw + (1.0 - self.alpha) * prev,
            None => raw,
        };
        self.smoothed = Some(rate);
        Some(rate)
    }

    /// Last smoothed rate, zeroed inside the dead zone
    pub fn rate(&self) -> f64 {
        match self.smoothed {
            Some(r) if r.abs() > self.dead_zone => r,
            _ => 0.0,
        }
    }

    pub fn dead_zone(&self) -> f64 {
        self.dead_zone
    }

    /// Clear history
    pub fn clear(&mut self) {
        self.last = None;
        self.smoothed = None;
    }
}

impl Default for AngularVelocity {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_ALPHA, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_needs_two_samples() {
        let mut v = AngularVelocity::default();
        assert!(v.update(0.0, 90.0).is_none());
        assert_abs_diff_eq!(v.update(0.5, 100.0).unwrap(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ema_smoothing() {
        let mut v = AngularVelocity::new(0.5, 0.0);
        v.update(0.0, 0.0);
        v.update(1.0, 10.0); // raw 10
        let r = v.update(2.0, 10.0).unwrap(); // raw 0
        assert_abs_diff_eq!(r, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_dead_zone() {
        let mut v = AngularVelocity::new(1.0, 2.0);
        v.update(0.0, 90.0);
        v.update(1.0, 91.0);
        assert_eq!(v.rate(), 0.0);
        v.update(2.0, 95.0);
        assert_abs_diff_eq!(v.rate(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stale_timestamp_ignored() {
        let mut v = AngularVelocity::new(1.0, 0.0);
        v.update(0.0, 0.0);
        v.update(1.0, 10.0);
        assert_abs_diff_eq!(v.update(1.0, 500.0).unwrap(), 10.0, epsilon = 1e-9);
        v.clear();
        assert!(v.update(5.0, 0.0).is_none());
    }
}
