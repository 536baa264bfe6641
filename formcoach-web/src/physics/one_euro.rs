//! One Euro Filter - adaptive low-pass filter for angle jitter
//!
//! Smooth when slow (holds a pose steady), responsive when fast (tracks
//! the working phase of a rep). One filter per angle name, grouped in a
//! `FilterBank` owned by exactly one live session.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::angles::AngleVector;

/// Filter tunables; trade jitter suppression against lag
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OneEuroConfig {
    /// Minimum cutoff frequency (Hz) - lower = smoother at rest
    pub min_cutoff: f64,
    /// Speed coefficient - higher = less lag during fast motion
    pub beta: f64,
    /// Derivative cutoff frequency (Hz)
    pub d_cutoff: f64,
}

impl Default for OneEuroConfig {
    fn default() -> Self {
        Self {
            min_cutoff: 1.0,
            beta: 0.007,
            d_cutoff: 1.0,
        }
    }
}

/// Per-angle filter history
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterState {
    pub previous_filtered_value: f64,
    pub previous_derivative: f64,
    pub previous_timestamp: f64,
}

/// Adaptive low-pass filter for a single scalar signal
#[derive(Clone, Debug)]
pub struct OneEuroFilter {
    config: OneEuroConfig,
    state: Option<FilterState>,
}

impl OneEuroFilter {
    pub fn new(config: OneEuroConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Calculate smoothing factor alpha
    fn smoothing_factor(t_e: f64, cutoff: f64) -> f64 {
        let r = 2.0 * PI * cutoff * t_e;
        r / (r + 1.0)
    }

    fn ema(new: f64, prev: f64, alpha: f64) -> f64 {
        alpha * new + (1.0 - alpha) * prev
    }

    /// Filter a single value
    ///
    /// - `t`: timestamp in seconds
    /// - `x`: raw input value
    ///
    /// The first sample seeds the state and passes through unchanged, as does
    /// any sample whose timestamp does not advance.
    pub fn filter(&mut self, t: f64, x: f64) -> f64 {
        let Some(prev) = self.state else {
            self.state = Some(FilterState {
                previous_filtered_value: x,
                previous_derivative: 0.0,
                previous_timestamp: t,
            });
            return x;
        };

        let t_e = t - prev.previous_timestamp;
        if t_e <= 0.0 {
            return x;
        }

        // 1. Estimate derivative
        let dx = (x - prev.previous_filtered_value) / t_e;
        let a_d = Self::smoothing_factor(t_e, self.config.d_cutoff);
        let edx = Self::ema(dx, prev.previous_derivative, a_d);

        // 2. Adaptive cutoff: more smoothing when slow, less when fast
        let cutoff = self.config.min_cutoff + self.config.beta * edx.abs();
        let a = Self::smoothing_factor(t_e, cutoff);

        // 3. Apply filter
        let x_hat = Self::ema(x, prev.previous_filtered_value, a);

        self.state = Some(FilterState {
            previous_filtered_value: x_hat,
            previous_derivative: edx,
            previous_timestamp: t,
        });

        x_hat
    }

    pub fn state(&self) -> Option<FilterState> {
        self.state
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.state = None;
    }
}

impl Default for OneEuroFilter {
    fn default() -> Self {
        Self::new(OneEuroConfig::default())
    }
}

/// One filter per angle name, created lazily on first sight of a name
#[derive(Clone, Debug, Default)]
pub struct FilterBank {
    config: OneEuroConfig,
    filters: BTreeMap<String, OneEuroFilter>,
}

impl FilterBank {
    pub fn new(config: OneEuroConfig) -> Self {
        Self {
            config,
            filters: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> OneEuroConfig {
        self.config
    }

    /// Smooth every angle present in `raw`. Absent angles leave their filter untouched.
    pub fn smooth(&mut self, raw: &AngleVector) -> AngleVector {
        let mut out = AngleVector::new(raw.timestamp);
        for (name, &value) in &raw.values {
            let config = self.config;
            let filter = self
                .filters
                .entry(name.clone())
                .or_insert_with(|| OneEuroFilter::new(config));
            out.insert(name, filter.filter(raw.timestamp, value));
        }
        out
    }

    pub fn state_of(&self, name: &str) -> Option<FilterState> {
        self.filters.get(name).and_then(|f| f.state())
    }

    pub fn tracked(&self) -> usize {
        self.filters.len()
    }

    /// Drop all history
    pub fn reset(&mut self) {
        self.filters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_first_sample_passes_through() {
        let mut f = OneEuroFilter::default();
        assert_eq!(f.filter(0.0, 42.0), 42.0);
    }

    #[test]
    fn test_constant_input_is_steady() {
        let mut f = OneEuroFilter::default();
        for i in 0..10 {
            let out = f.filter(i as f64 * 0.033, 95.0);
            assert_abs_diff_eq!(out, 95.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(f.state().unwrap().previous_derivative, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_elapsed_is_noop() {
        let mut f = OneEuroFilter::default();
        f.filter(1.0, 10.0);
        let before = f.state();
        assert_eq!(f.filter(1.0, 50.0), 50.0);
        assert_eq!(f.state(), before);
    }

    #[test]
    fn test_step_is_attenuated() {
        let mut f = OneEuroFilter::default();
        f.filter(0.0, 0.0);
        let out = f.filter(1.0 / 30.0, 100.0);
        assert!(out > 0.0 && out < 100.0);
    }

    #[test]
    fn test_deterministic() {
        let inputs: Vec<(f64, f64)> = (0..50)
            .map(|i| (i as f64 / 30.0, 90.0 + ((i * 7) % 13) as f64))
            .collect();
        let run = || {
            let mut f = OneEuroFilter::default();
            inputs.iter().map(|&(t, x)| f.filter(t, x)).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_bank_tracks_names_independently() {
        let mut bank = FilterBank::new(OneEuroConfig::default());
        bank.smooth(&AngleVector::new(0.0).with("a", 10.0).with("b", 20.0));
        let out = bank.smooth(&AngleVector::new(0.1).with("a", 10.0));
        assert_abs_diff_eq!(out.get("a").unwrap(), 10.0, epsilon = 1e-12);
        assert!(out.get("b").is_none());
        assert_eq!(bank.state_of("b").unwrap().previous_timestamp, 0.0);

        bank.reset();
        assert_eq!(bank.tracked(), 0);
    }
}
