//! Superseded window evaluation
//!
//! The earlier scoring pass, kept so previously stored evaluations can be
//! re-read and compared: no tail trimming, each interval classified by its
//! left endpoint over the full trace, fixed alert strings at coarser
//! thresholds, and no risk level. New code uses [`super::evaluate`].

use serde::{Deserialize, Serialize};

use super::WindowError;

// Alert thresholds, in percent of the full trace duration
const ABOVE_ALERT_PCT: f64 = 5.0;
const BELOW_ALERT_PCT: f64 = 20.0;
const WITHIN_ALERT_PCT: f64 = 50.0;

/// Output of the superseded evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyEvaluation {
    pub pct_below: f64,
    pub pct_within: f64,
    pub pct_above: f64,
    pub time_below_hr: f64,
    pub time_within_hr: f64,
    pub time_above_hr: f64,
    pub alerts: Vec<String>,
}

/// Classify each interval by its left endpoint against `[lower, upper]`.
///
/// The whole trace is integrated; bounds are taken as given, without
/// validation. Mismatched sample lengths are the one rejected input.
pub fn evaluate(
    times_hr: &[f64],
    conc_mg_per_l: &[f64],
    lower_mg_per_l: f64,
    upper_mg_per_l: f64,
) -> Result<LegacyEvaluation, WindowError> {
    if times_hr.len() != conc_mg_per_l.len() {
        return Err(WindowError::MismatchedLengths {
            times: times_hr.len(),
            concs: conc_mg_per_l.len(),
        });
    }

    let mut total = 0.0;
    let mut below = 0.0;
    let mut within = 0.0;
    let mut above = 0.0;

    for i in 0..times_hr.len().saturating_sub(1) {
        let dt = times_hr[i + 1] - times_hr[i];
        total += dt;
        let c = conc_mg_per_l[i];
        if c < lower_mg_per_l {
            below += dt;
        } else if c > upper_mg_per_l {
            above += dt;
        } else {
            within += dt;
        }
    }

    let (pct_below, pct_within, pct_above) = if total > 0.0 {
        (
            below / total * 100.0,
            within / total * 100.0,
            above / total * 100.0,
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    let mut alerts = Vec::new();
    if pct_above > ABOVE_ALERT_PCT {
        alerts.push(
            "HIGH_RISK: concentration above therapeutic max for >5% of period".to_string(),
        );
    }
    if pct_below > BELOW_ALERT_PCT {
        alerts.push(
            "LOW_RISK: concentration below therapeutic min for >20% of period".to_string(),
        );
    }
    if pct_within < WITHIN_ALERT_PCT {
        alerts.push(
            "SUBOPTIMAL: concentration within therapeutic window <50% of period".to_string(),
        );
    }

    Ok(LegacyEvaluation {
        pct_below,
        pct_within,
        pct_above,
        time_below_hr: below,
        time_within_hr: within,
        time_above_hr: above,
        alerts,
    })
}
