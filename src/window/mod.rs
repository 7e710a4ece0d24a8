//! Therapeutic-window evaluation
//!
//! Scores how much of a concentration-time course sits below, within, and
//! above a therapeutic band, then folds the percentages into a categorical
//! risk level and human-readable alerts.
//!
//! The evaluation ignores the long terminal tail: only the "active" span
//! where the concentration reaches at least 10% of the band's lower bound
//! is integrated, with each adjacent sample pair classified by its midpoint
//! concentration. A superseded variant without trimming lives in [`legacy`]
//! for backward-compatible reads of old evaluations.

pub mod legacy;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulator::ConcentrationTrace;

/// Fraction of the lower bound a sample must reach to count as active
const ACTIVE_THRESHOLD_FRACTION: f64 = 0.1;

// Risk tier cutoffs, in percent of the active span
const HIGH_ABOVE_PCT: f64 = 30.0;
const HIGH_BELOW_PCT: f64 = 50.0;
const MODERATE_ABOVE_PCT: f64 = 10.0;
const MODERATE_BELOW_PCT: f64 = 30.0;

/// Errors from window construction and evaluation inputs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    /// Bounds must satisfy `0 < lower < upper`
    #[error("therapeutic window bounds must satisfy 0 < lower < upper, got [{lower}, {upper}] mg/L")]
    InvalidBounds { lower: f64, upper: f64 },

    /// Sample vectors must line up one-to-one
    #[error("times and concentrations must have the same length, got {times} and {concs}")]
    MismatchedLengths { times: usize, concs: usize },
}

// ============================================================================
// Types
// ============================================================================

/// A validated therapeutic concentration band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TherapeuticWindow {
    lower_mg_per_l: f64,
    upper_mg_per_l: f64,
}

impl TherapeuticWindow {
    pub fn new(lower_mg_per_l: f64, upper_mg_per_l: f64) -> Result<Self, WindowError> {
        if lower_mg_per_l <= 0.0 || upper_mg_per_l <= lower_mg_per_l {
            return Err(WindowError::InvalidBounds {
                lower: lower_mg_per_l,
                upper: upper_mg_per_l,
            });
        }
        Ok(Self {
            lower_mg_per_l,
            upper_mg_per_l,
        })
    }

    pub fn lower_mg_per_l(&self) -> f64 {
        self.lower_mg_per_l
    }

    pub fn upper_mg_per_l(&self) -> f64 {
        self.upper_mg_per_l
    }
}

/// Categorical dosing risk derived from time-out-of-range percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    None,
    Low,
    Moderate,
    High,
    Unknown,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::None => "NONE",
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// How a trace's exposure splits against a therapeutic band.
///
/// Percentages and times cover the *active* evaluation span, so
/// `pct_below + pct_within + pct_above ≈ 100` and the time buckets sum to
/// the active span's duration. `off_score` is the total percentage out of
/// range, on either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowEvaluation {
    pub pct_below: f64,
    pub pct_within: f64,
    pub pct_above: f64,
    pub time_below_hr: f64,
    pub time_within_hr: f64,
    pub time_above_hr: f64,
    pub off_score: f64,
    pub risk_level: RiskLevel,
    pub alerts: Vec<String>,
}

impl WindowEvaluation {
    /// The evaluation returned for inputs too thin or malformed to score
    fn insufficient() -> Self {
        Self {
            pct_below: 0.0,
            pct_within: 0.0,
            pct_above: 0.0,
            time_below_hr: 0.0,
            time_within_hr: 0.0,
            time_above_hr: 0.0,
            off_score: 0.0,
            risk_level: RiskLevel::Unknown,
            alerts: vec!["Insufficient data to evaluate therapeutic window.".to_string()],
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluate a simulated trace against a validated window.
pub fn evaluate(trace: &ConcentrationTrace, window: &TherapeuticWindow) -> WindowEvaluation {
    evaluate_samples(
        trace.times_hr(),
        trace.conc_mg_per_l(),
        window.lower_mg_per_l(),
        window.upper_mg_per_l(),
    )
}

/// Evaluate raw time/concentration samples against raw band bounds.
///
/// Degenerate inputs (fewer than two samples, mismatched lengths, or bounds
/// violating `0 < lower < upper`) yield [`RiskLevel::Unknown`] with a single
/// explanatory alert rather than an error, so serialized legacy inputs stay
/// scoreable.
pub fn evaluate_samples(
    times_hr: &[f64],
    conc_mg_per_l: &[f64],
    lower_mg_per_l: f64,
    upper_mg_per_l: f64,
) -> WindowEvaluation {
    if times_hr.len() < 2
        || times_hr.len() != conc_mg_per_l.len()
        || lower_mg_per_l <= 0.0
        || upper_mg_per_l <= lower_mg_per_l
    {
        return WindowEvaluation::insufficient();
    }

    // Trim the terminal tail: evaluate only between the first and last
    // sample at or above 10% of the lower bound.
    let threshold = ACTIVE_THRESHOLD_FRACTION * lower_mg_per_l;
    let start = conc_mg_per_l.iter().position(|c| *c >= threshold);
    let end = conc_mg_per_l.iter().rposition(|c| *c >= threshold);

    let (Some(start), Some(end)) = (start, end) else {
        let total = (times_hr[times_hr.len() - 1] - times_hr[0]).max(1e-9);
        return WindowEvaluation {
            pct_below: 100.0,
            pct_within: 0.0,
            pct_above: 0.0,
            time_below_hr: total,
            time_within_hr: 0.0,
            time_above_hr: 0.0,
            off_score: 100.0,
            risk_level: RiskLevel::High,
            alerts: vec![format!(
                "Concentration never reached 10% of lower bound ({threshold:.2} mg/L). \
                 Essentially always below range."
            )],
        };
    };

    let eval_start = times_hr[start];
    let eval_end = times_hr[end];
    let total = (eval_end - eval_start).max(1e-9);

    let mut time_below = 0.0;
    let mut time_within = 0.0;
    let mut time_above = 0.0;

    for i in start..end {
        let dt = times_hr[i + 1] - times_hr[i];
        if dt <= 0.0 {
            continue;
        }
        let c_mid = 0.5 * (conc_mg_per_l[i] + conc_mg_per_l[i + 1]);
        if c_mid < lower_mg_per_l {
            time_below += dt;
        } else if c_mid > upper_mg_per_l {
            time_above += dt;
        } else {
            time_within += dt;
        }
    }

    let pct_below = 100.0 * time_below / total;
    let pct_within = 100.0 * time_within / total;
    let pct_above = 100.0 * time_above / total;

    let risk_level = if pct_above > HIGH_ABOVE_PCT || pct_below > HIGH_BELOW_PCT {
        RiskLevel::High
    } else if pct_above > MODERATE_ABOVE_PCT || pct_below > MODERATE_BELOW_PCT {
        RiskLevel::Moderate
    } else if pct_above > 0.0 || pct_below > 0.0 {
        RiskLevel::Low
    } else {
        RiskLevel::None
    };

    let mut alerts = vec![format!(
        "Evaluated between t = {eval_start:.1}-{eval_end:.1} h for window \
         [{lower_mg_per_l:.2}, {upper_mg_per_l:.2}] mg/L."
    )];
    if time_above > 0.0 {
        alerts.push(format!(
            "Above therapeutic range for {time_above:.1} h ({pct_above:.1}% of evaluated time)."
        ));
    }
    if time_below > 0.0 {
        alerts.push(format!(
            "Below therapeutic range for {time_below:.1} h ({pct_below:.1}% of evaluated time)."
        ));
    }
    if time_within > 0.0 {
        alerts.push(format!(
            "Within therapeutic range for {time_within:.1} h ({pct_within:.1}% of evaluated time)."
        ));
    }

    WindowEvaluation {
        pct_below,
        pct_within,
        pct_above,
        time_below_hr: time_below,
        time_within_hr: time_within,
        time_above_hr: time_above,
        off_score: pct_above + pct_below,
        risk_level,
        alerts,
    }
}
