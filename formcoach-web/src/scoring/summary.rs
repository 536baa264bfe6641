//! Session-level aggregation of rep errors

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rep_error::{RepError, ScoringConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorTrend {
    Improving,
    Declining,
    Stable,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepErrorSummary {
    pub average_error: f64,
    pub best_rep: u32,
    pub worst_rep: u32,
    pub error_trend: ErrorTrend,
    pub common_mistakes: Vec<String>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

impl RepErrorSummary {
    /// `None` until at least one rep has been scored
    pub fn from_errors(errors: &[RepError], config: &ScoringConfig) -> Option<Self> {
        let average_error = mean(errors.iter().map(|e| e.overall_error))?;

        // Ties resolve to the earliest rep
        let mut best = &errors[0];
        let mut worst = &errors[0];
        for e in &errors[1..] {
            if e.overall_error < best.overall_error {
                best = e;
            }
            if e.overall_error > worst.overall_error {
                worst = e;
            }
        }

        Some(Self {
            average_error,
            best_rep: best.rep_number,
            worst_rep: worst.rep_number,
            error_trend: trend(errors, config.trend_threshold_deg),
            common_mistakes: common_mistakes(errors, config.mistake_threshold_pct),
        })
    }
}

/// First half against second half of the session
fn trend(errors: &[RepError], threshold: f64) -> ErrorTrend {
    if errors.len() < 2 {
        return ErrorTrend::Stable;
    }
    let (first, second) = errors.split_at(errors.len() / 2);
    let a = mean(first.iter().map(|e| e.overall_error)).unwrap_or_default();
    let b = mean(second.iter().map(|e| e.overall_error)).unwrap_or_default();

    if a - b >= threshold {
        ErrorTrend::Improving
    } else if b - a >= threshold {
        ErrorTrend::Declining
    } else {
        ErrorTrend::Stable
    }
}

/// Angles whose average percent error exceeds the threshold, worst first
fn common_mistakes(errors: &[RepError], threshold_pct: f64) -> Vec<String> {
    let mut per_angle: BTreeMap<&str, (f64, f64, usize)> = BTreeMap::new();
    for e in errors {
        for (name, a) in &e.per_angle_error {
            let entry = per_angle.entry(name.as_str()).or_insert((0.0, 0.0, 0));
            entry.0 += a.percent_error;
            entry.1 += a.actual - a.expected;
            entry.2 += 1;
        }
    }

    let mut flagged: Vec<(f64, String)> = per_angle
        .into_iter()
        .filter_map(|(name, (pct_sum, signed_sum, n))| {
            let pct = pct_sum / n as f64;
            if pct <= threshold_pct {
                return None;
            }
            let offset = signed_sum / n as f64;
            let direction = if offset >= 0.0 { "over" } else { "under" };
            Some((
                pct,
                format!(
                    "{}: {:.1}° {} target on average ({:.0}% of range)",
                    name,
                    offset.abs(),
                    direction,
                    pct
                ),
            ))
        })
        .collect();

    flagged.sort_by(|a, b| b.0.total_cmp(&a.0));
    flagged.into_iter().map(|(_, text)| text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::rep_error::AngleError;
    use approx::assert_abs_diff_eq;

    fn rep(n: u32, overall: f64, knee_pct: f64) -> RepError {
        let mut per_angle_error = BTreeMap::new();
        per_angle_error.insert(
            "right_knee".to_string(),
            AngleError {
                expected: 170.0,
                actual: 170.0 - overall,
                absolute_error: overall,
                percent_error: knee_pct,
            },
        );
        RepError {
            rep_number: n,
            timestamp: n as f64,
            per_angle_error,
            overall_error: overall,
            form_score: 100.0 - overall / 2.0,
            matched_state_name: "state_2".to_string(),
        }
    }

    #[test]
    fn test_empty_has_no_summary() {
        assert!(RepErrorSummary::from_errors(&[], &ScoringConfig::default()).is_none());
    }

    #[test]
    fn test_best_worst_and_average() {
        let errors = vec![rep(1, 6.0, 10.0), rep(2, 2.0, 10.0), rep(3, 10.0, 10.0)];
        let s = RepErrorSummary::from_errors(&errors, &ScoringConfig::default()).unwrap();
        assert_abs_diff_eq!(s.average_error, 6.0);
        assert_eq!(s.best_rep, 2);
        assert_eq!(s.worst_rep, 3);
        assert!(s.common_mistakes.is_empty());
    }

    #[test]
    fn test_trend_labels() {
        let cfg = ScoringConfig::default();
        let improving = vec![rep(1, 10.0, 0.0), rep(2, 9.0, 0.0), rep(3, 4.0, 0.0), rep(4, 3.0, 0.0)];
        let declining = vec![rep(1, 3.0, 0.0), rep(2, 8.0, 0.0)];
        let stable = vec![rep(1, 5.0, 0.0), rep(2, 6.0, 0.0)];
        let single = vec![rep(1, 5.0, 0.0)];

        let t = |e: &[RepError]| RepErrorSummary::from_errors(e, &cfg).unwrap().error_trend;
        assert_eq!(t(&improving), ErrorTrend::Improving);
        assert_eq!(t(&declining), ErrorTrend::Declining);
        assert_eq!(t(&stable), ErrorTrend::Stable);
        assert_eq!(t(&single), ErrorTrend::Stable);
    }

    #[test]
    fn test_common_mistakes_flag_large_percent() {
        let errors = vec![rep(1, 8.0, 40.0), rep(2, 8.0, 30.0)];
        let s = RepErrorSummary::from_errors(&errors, &ScoringConfig::default()).unwrap();
        assert_eq!(s.common_mistakes.len(), 1);
        assert_eq!(s.common_mistakes[0], "right_knee: 8.0° under target on average (35% of range)");
    }

    #[test]
    fn test_trend_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ErrorTrend::Improving).unwrap(), "\"improving\"");
    }
}
