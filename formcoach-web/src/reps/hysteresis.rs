//! Peak/valley rep counter on one primary angle
//!
//! Direction flips only when the smoothed derivative leaves the dead band.
//! Up -> Down records the peak of the rising phase; Down -> Up records the
//! valley and validates the cycle:
//!   rom = peak - valley >= max(min_rom, fraction * window range)
//!   peak >= peak_min, valley <= trough_max, cooldown since last rep
//! Cycles that fail are logged and tallied, never emitted as events.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::strategy::{RepEvent, RepObservation, RepetitionStrategy};
use crate::classifier::ExerciseTemplate;
use crate::physics::AngularVelocity;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HysteresisConfig {
    /// Angle to track; `None` takes the template's driver angle
    pub primary_angle: Option<String>,
    /// Derivative dead band (degrees/second)
    pub band_deg_per_s: f64,
    /// EMA weight of the newest derivative sample
    pub derivative_alpha: f64,
    pub min_rom_deg: f64,
    /// Share of the recent window's range a rep must cover
    pub rom_window_fraction: f64,
    /// Length of the range window (seconds)
    pub window_s: f64,
    pub peak_min: f64,
    pub trough_max: f64,
    pub cooldown_s: f64,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            primary_angle: None,
            band_deg_per_s: 2.0,
            derivative_alpha: 0.5,
            min_rom_deg: 15.0,
            rom_window_fraction: 0.3,
            window_s: 4.0,
            peak_min: 0.0,
            trough_max: 180.0,
            cooldown_s: 0.8,
        }
    }
}

impl HysteresisConfig {
    /// Seated knee extension: straight leg above 150°, bent below 110°
    pub fn knee_extension() -> Self {
        Self {
            primary_angle: Some("right_knee".to_string()),
            peak_min: 150.0,
            trough_max: 110.0,
            ..Self::default()
        }
    }

    /// Squat: standing above 160°, bottom below 120°
    pub fn squat() -> Self {
        Self {
            primary_angle: Some("right_knee".to_string()),
            min_rom_deg: 30.0,
            peak_min: 160.0,
            trough_max: 120.0,
            cooldown_s: 1.0,
            ..Self::default()
        }
    }

    /// Bicep curl: arm extended above 140°, curled below 70°
    pub fn bicep_curl() -> Self {
        Self {
            primary_angle: Some("right_elbow".to_string()),
            min_rom_deg: 40.0,
            peak_min: 140.0,
            trough_max: 70.0,
            cooldown_s: 0.6,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Clone, Debug)]
pub struct HysteresisCounter {
    config: HysteresisConfig,
    primary: Option<String>,
    velocity: AngularVelocity,
    direction: Option<Direction>,
    /// Extremes seen since the last direction change
    phase_min: f64,
    phase_max: f64,
    window: VecDeque<(f64, f64)>,
    peak: Option<f64>,
    count: u32,
    rejected: u32,
    last_rep_time: Option<f64>,
}

impl HysteresisCounter {
    pub fn new(config: HysteresisConfig) -> Self {
        Self {
            primary: config.primary_angle.clone(),
            velocity: AngularVelocity::new(config.derivative_alpha, config.band_deg_per_s),
            config,
            direction: None,
            phase_min: f64::INFINITY,
            phase_max: f64::NEG_INFINITY,
            window: VecDeque::new(),
            peak: None,
            count: 0,
            rejected: 0,
            last_rep_time: None,
        }
    }

    pub fn primary_angle(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Completed cycles that failed validation since the last reset
    pub fn rejected_cycles(&self) -> u32 {
        self.rejected
    }

    fn clear_tracking(&mut self) {
        self.velocity.clear();
        self.direction = None;
        self.phase_min = f64::INFINITY;
        self.phase_max = f64::NEG_INFINITY;
        self.window.clear();
        self.peak = None;
    }

    fn window_range(&self) -> f64 {
        let (lo, hi) = self
            .window
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, v)| {
                (lo.min(v), hi.max(v))
            });
        if hi >= lo {
            hi - lo
        } else {
            0.0
        }
    }

    fn window_max(&self) -> Option<f64> {
        self.window.iter().map(|&(_, v)| v).reduce(f64::max)
    }

    fn complete_cycle(&mut self, valley: f64, t: f64) -> Option<RepEvent> {
        let peak = self.peak?;
        let rom = peak - valley;
        let required = self
            .config
            .min_rom_deg
            .max(self.config.rom_window_fraction * self.window_range());
        let cooled = self
            .last_rep_time
            .map_or(true, |last| t - last >= self.config.cooldown_s);

        let rejection = if rom < required {
            Some(format!("rom {:.1}° below {:.1}°", rom, required))
        } else if peak < self.config.peak_min {
            Some(format!("peak {:.1}° below {:.1}°", peak, self.config.peak_min))
        } else if valley > self.config.trough_max {
            Some(format!("valley {:.1}° above {:.1}°", valley, self.config.trough_max))
        } else if !cooled {
            Some("inside cooldown".to_string())
        } else {
            None
        };

        if let Some(reason) = rejection {
            self.rejected += 1;
            log::debug!("cycle at {:.2}s rejected: {}", t, reason);
            return None;
        }

        self.count += 1;
        self.last_rep_time = Some(t);
        self.peak = None;
        log::info!(
            "rep {} completed at {:.2}s (peak {:.1}°, valley {:.1}°)",
            self.count,
            t,
            peak,
            valley
        );
        Some(RepEvent {
            rep_number: self.count,
            timestamp: t,
            valid: true,
        })
    }
}

impl RepetitionStrategy for HysteresisCounter {
    fn name(&self) -> &'static str {
        "hysteresis"
    }

    fn observe(&mut self, obs: &RepObservation) -> Option<RepEvent> {
        let value = obs.angles.get(self.primary.as_deref()?)?;
        let t = obs.timestamp;

        self.window.push_back((t, value));
        while let Some(&(t0, _)) = self.window.front() {
            if t - t0 > self.config.window_s {
                self.window.pop_front();
            } else {
                break;
            }
        }

        self.phase_min = self.phase_min.min(value);
        self.phase_max = self.phase_max.max(value);

        self.velocity.update(t, value);
        let rate = self.velocity.rate();
        let next = if rate > 0.0 {
            Some(Direction::Up)
        } else if rate < 0.0 {
            Some(Direction::Down)
        } else {
            self.direction
        };

        if next == self.direction {
            return None;
        }

        let previous = self.direction;
        self.direction = next;
        let (phase_min, phase_max) = (self.phase_min, self.phase_max);
        self.phase_min = value;
        self.phase_max = value;

        match (previous, next) {
            (Some(Direction::Up), Some(Direction::Down)) => {
                self.peak = Some(phase_max);
                None
            }
            (None, Some(Direction::Down)) => {
                self.peak = self.window_max();
                None
            }
            (Some(Direction::Down), Some(Direction::Up)) => self.complete_cycle(phase_min, t),
            _ => None,
        }
    }

    fn count(&self) -> u32 {
        self.count
    }

    fn reset(&mut self) {
        self.clear_tracking();
        self.count = 0;
        self.rejected = 0;
        self.last_rep_time = None;
    }

    fn adopt_template(&mut self, template: &ExerciseTemplate) {
        if self.config.primary_angle.is_none() {
            let driver = template.driver_angle();
            if driver != self.primary {
                log::debug!("hysteresis counter tracking driver angle {:?}", driver);
                self.primary = driver;
                self.clear_tracking();
            }
        }
    }

    fn release_template(&mut self) {
        if self.primary != self.config.primary_angle {
            self.primary = self.config.primary_angle.clone();
            self.clear_tracking();
        }
    }
}
