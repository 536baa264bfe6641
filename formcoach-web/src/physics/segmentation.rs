//! Movement segmentation for human-readable summaries
//!
//! Re-smooths a full angle series, then splits it into monotonic stretches.
//! Reversals smaller than the noise floor do not end a stretch; stretches
//! that are too small or too short are not reported.
//!
//! Diagnostic only: counting and scoring never read these segments.

use serde::{Deserialize, Serialize};

use super::angles::AngleSeries;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SegmenterConfig {
    /// EMA weight of the newest sample in the secondary smoothing pass
    pub smoothing_factor: f64,
    /// Minimum accumulated change to report a segment (degrees)
    pub min_change_deg: f64,
    /// Minimum segment duration (seconds)
    pub min_duration_s: f64,
    /// Reversals below this are treated as jitter (degrees)
    pub noise_floor_deg: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.35,
            min_change_deg: 20.0,
            min_duration_s: 0.4,
            noise_floor_deg: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSegment {
    pub angle_name: String,
    pub start_angle: f64,
    pub end_angle: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub delta: f64,
}

impl MovementSegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// e.g. `right_knee: 92° → 168° (+76°) over 0.84s`
    pub fn describe(&self) -> String {
        format!(
            "{}: {:.0}° → {:.0}° ({:+.0}°) over {:.2}s",
            self.angle_name,
            self.start_angle,
            self.end_angle,
            self.delta,
            self.duration()
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trend {
    Rising,
    Falling,
}

#[derive(Clone, Copy, Debug)]
struct Point {
    t: f64,
    v: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct MovementSegmenter {
    config: SegmenterConfig,
}

impl MovementSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Secondary exponential smoothing pass
    fn resmooth(&self, series: &AngleSeries) -> Vec<Point> {
        let a = self.config.smoothing_factor.clamp(0.0, 1.0);
        let mut out: Vec<Point> = Vec::with_capacity(series.len());
        for (t, v) in series.points() {
            let v = match out.last() {
                Some(prev) => a * v + (1.0 - a) * prev.v,
                None => v,
            };
            out.push(Point { t, v });
        }
        out
    }

    pub fn segment(&self, series: &AngleSeries) -> Vec<MovementSegment> {
        let points = self.resmooth(series);
        let Some(&first) = points.first() else {
            return Vec::new();
        };

        let floor = self.config.noise_floor_deg;
        let mut segments = Vec::new();
        let mut trend: Option<Trend> = None;
        let mut anchor = first;
        let mut extreme = first;
        // Before the first trend is known, track both ends
        let mut low = first;
        let mut high = first;

        for &p in &points[1..] {
            match trend {
                None => {
                    if p.v < low.v {
                        low = p;
                    }
                    if p.v > high.v {
                        high = p;
                    }
                    if p.v - low.v >= floor {
                        trend = Some(Trend::Rising);
                        anchor = low;
                        extreme = p;
                    } else if high.v - p.v >= floor {
                        trend = Some(Trend::Falling);
                        anchor = high;
                        extreme = p;
                    }
                }
                Some(Trend::Rising) => {
                    if p.v >= extreme.v {
                        extreme = p;
                    } else if extreme.v - p.v >= floor {
                        self.close(series, anchor, extreme, &mut segments);
                        anchor = extreme;
                        extreme = p;
                        trend = Some(Trend::Falling);
                    }
                }
                Some(Trend::Falling) => {
                    if p.v <= extreme.v {
                        extreme = p;
                    } else if p.v - extreme.v >= floor {
                        self.close(series, anchor, extreme, &mut segments);
                        anchor = extreme;
                        extreme = p;
                        trend = Some(Trend::Rising);
                    }
                }
            }
        }

        if trend.is_some() {
            self.close(series, anchor, extreme, &mut segments);
        }
        segments
    }

    fn close(&self, series: &AngleSeries, from: Point, to: Point, out: &mut Vec<MovementSegment>) {
        let delta = to.v - from.v;
        if delta.abs() >= self.config.min_change_deg
            && to.t - from.t >= self.config.min_duration_s
        {
            out.push(MovementSegment {
                angle_name: series.name.clone(),
                start_angle: from.v,
                end_angle: to.v,
                start_time: from.t,
                end_time: to.t,
                delta,
            });
        }
    }
}

impl Default for MovementSegmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}
