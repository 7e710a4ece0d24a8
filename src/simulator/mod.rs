//! Concentration-time simulation
//!
//! Time-steps a one/two-pool absorption-elimination model over a multi-dose
//! regimen and records the plasma concentration at every step. The model has
//! an optional gut depot (used only when the regimen carries an absorption
//! rate constant) feeding a central compartment that eliminates at
//! `kel = CL / Vd`.
//!
//! # Integration accuracy
//!
//! The integrator is explicit forward Euler with a fixed step. Per-step
//! error grows with `kel × dt_hr`, so coarse steps under-resolve fast
//! elimination. This is a known limitation of the scheme; it stays in place
//! so traces remain reproducible against previously stored runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::PkConfig;
use crate::params::{self, DosingRegimen, PkParameters, LN_2};

/// Errors from trace simulation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulateError {
    /// Clearance or volume of distribution could not be resolved, even
    /// after the fallback chain ran over the supplied parameters
    #[error("insufficient PK parameters, missing {missing:?}: need clearance and volume of distribution, or half-life plus one of them")]
    InsufficientParameters { missing: Vec<&'static str> },
}

// ============================================================================
// Concentration trace
// ============================================================================

/// An immutable concentration-time course.
///
/// Times start at 0 and increase strictly with a constant step; every
/// concentration is ≥ 0. Produced once by [`simulate`], never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationTrace {
    times_hr: Vec<f64>,
    conc_mg_per_l: Vec<f64>,
}

impl ConcentrationTrace {
    pub fn times_hr(&self) -> &[f64] {
        &self.times_hr
    }

    pub fn conc_mg_per_l(&self) -> &[f64] {
        &self.conc_mg_per_l
    }

    pub fn len(&self) -> usize {
        self.times_hr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_hr.is_empty()
    }

    /// Paired `(time_hr, conc_mg_per_l)` samples
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times_hr
            .iter()
            .copied()
            .zip(self.conc_mg_per_l.iter().copied())
    }

    /// Peak concentration over the trace
    pub fn cmax_mg_l(&self) -> Option<f64> {
        self.conc_mg_per_l.iter().copied().reduce(f64::max)
    }

    /// Trough concentration over the trace
    pub fn cmin_mg_l(&self) -> Option<f64> {
        self.conc_mg_per_l.iter().copied().reduce(f64::min)
    }

    /// Area under the curve by the linear trapezoid rule
    pub fn auc_mg_h_l(&self) -> f64 {
        let mut auc = 0.0;
        for i in 1..self.len() {
            let dt = self.times_hr[i] - self.times_hr[i - 1];
            auc += 0.5 * (self.conc_mg_per_l[i] + self.conc_mg_per_l[i - 1]) * dt;
        }
        auc
    }

    /// Time of the last sample
    pub fn duration_hr(&self) -> f64 {
        self.times_hr.last().copied().unwrap_or(0.0)
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Simulate a dosing regimen into a concentration-time trace.
///
/// The resolver's fallback chain ([`params::apply_defaults`]) is applied to
/// `params` first, so callers may pass a partial set; the run fails with
/// [`SimulateError::InsufficientParameters`] only when clearance or Vd are
/// still unresolved afterwards.
///
/// At each step, in order: scheduled doses within `dt/2` of the current
/// time enter the gut depot (or the central pool directly, scaled by
/// bioavailability, when no absorption rate is configured); the depot
/// transfers `ka × gut × dt` into the central pool; the central pool loses
/// `kel × central × dt`; the concentration `central / Vd` is recorded.
/// Transfers are clamped so neither pool goes negative.
///
/// When the regimen has no explicit horizon, it defaults to
/// `num_doses × interval + 5 × half_life`, which carries the terminal decay
/// below 5% of the steady level. The trace is truncated to the configured
/// sample cap before being returned.
pub fn simulate(
    params: &PkParameters,
    regimen: &DosingRegimen,
    config: &PkConfig,
) -> Result<ConcentrationTrace, SimulateError> {
    let resolved = params::apply_defaults(*params, regimen, config);
    let (Some(cl), Some(vd)) = (
        resolved.clearance_l_per_hr,
        resolved.volume_of_distribution_l,
    ) else {
        return Err(SimulateError::InsufficientParameters {
            missing: resolved.missing_core_fields(),
        });
    };
    // apply_defaults always fills bioavailability
    let f = resolved.bioavailability_f.unwrap_or(1.0);

    let kel = cl / vd;
    let half_life = match resolved.half_life_hr {
        Some(h) if h > 0.0 => h,
        _ => LN_2 / kel,
    };
    let t_end = regimen
        .t_end_hr()
        .unwrap_or(regimen.num_doses() as f64 * regimen.interval_hr() + 5.0 * half_life);

    let dt = regimen.dt_hr();
    let ka = regimen.absorption_rate_hr();
    let dose = regimen.dose_mg();

    let n_samples = (t_end / dt + 1e-9).floor() as usize + 1;
    let kept = n_samples.min(config.max_trace_samples);
    if kept < n_samples {
        debug!(
            cap = config.max_trace_samples,
            dropped = n_samples - kept,
            "trace truncated to sample cap"
        );
    }

    let mut times_hr = Vec::with_capacity(kept);
    let mut conc_mg_per_l = Vec::with_capacity(kept);
    let mut gut_mg = 0.0_f64;
    let mut central_mg = 0.0_f64;

    for step in 0..kept {
        let t = step as f64 * dt;

        for i in 0..regimen.num_doses() {
            let dose_time = i as f64 * regimen.interval_hr();
            if (t - dose_time).abs() < dt / 2.0 {
                if ka.is_some() {
                    gut_mg += dose;
                } else {
                    central_mg += dose * f;
                }
            }
        }

        if let Some(ka) = ka {
            let absorbed = (ka * gut_mg * dt).min(gut_mg);
            gut_mg -= absorbed;
            central_mg += absorbed * f;
        }

        let eliminated = (kel * central_mg * dt).min(central_mg);
        central_mg -= eliminated;

        times_hr.push(t);
        conc_mg_per_l.push(if vd > 0.0 { central_mg / vd } else { 0.0 });
    }

    Ok(ConcentrationTrace {
        times_hr,
        conc_mg_per_l,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================================================
    // Test fixtures
    // ========================================================================

    /// 500 mg IV bolus into Vd 50 L with CL 3.5 L/h (t½ ≈ 9.9 h)
    fn bolus_params() -> PkParameters {
        PkParameters {
            clearance_l_per_hr: Some(3.5),
            volume_of_distribution_l: Some(50.0),
            bioavailability_f: Some(1.0),
            ..Default::default()
        }
    }

    fn single_bolus_regimen() -> DosingRegimen {
        DosingRegimen::builder(500.0, 24.0, 1).build().unwrap()
    }

    #[test]
    fn single_bolus_matches_hand_calculation() {
        let trace = simulate(&bolus_params(), &single_bolus_regimen(), &PkConfig::default())
            .unwrap();

        // C(0) = dose / Vd, minus one Euler elimination step
        let c0 = trace.conc_mg_per_l()[0];
        assert!((c0 - 10.0).abs() < 0.1, "C(0) was {c0}");

        // one half-life later the concentration has roughly halved
        let half = LN_2 * 50.0 / 3.5;
        let idx = (half / 0.1).round() as usize;
        let c_half = trace.conc_mg_per_l()[idx];
        assert!((c_half - 5.0).abs() < 0.2, "C(t½) was {c_half}");
    }

    #[test]
    fn bolus_decays_monotonically() {
        let trace = simulate(&bolus_params(), &single_bolus_regimen(), &PkConfig::default())
            .unwrap();
        for pair in trace.conc_mg_per_l().windows(2) {
            assert!(pair[1] <= pair[0], "concentration rose: {pair:?}");
        }
    }

    #[test]
    fn times_strictly_increase_with_constant_step() {
        let regimen = DosingRegimen::builder(250.0, 8.0, 4)
            .absorption_rate(1.2)
            .dt(0.25)
            .build()
            .unwrap();
        let trace = simulate(&bolus_params(), &regimen, &PkConfig::default()).unwrap();

        assert_relative_eq!(trace.times_hr()[0], 0.0);
        for pair in trace.times_hr().windows(2) {
            assert!(pair[1] > pair[0]);
            assert_relative_eq!(pair[1] - pair[0], 0.25, epsilon = 1e-9);
        }
        assert!(trace.conc_mg_per_l().iter().all(|c| *c >= 0.0));
    }

    #[test]
    fn default_horizon_reaches_terminal_decay() {
        let trace = simulate(&bolus_params(), &single_bolus_regimen(), &PkConfig::default())
            .unwrap();
        // horizon = 1 × 24 h + 5 half-lives
        let expected_end = 24.0 + 5.0 * (LN_2 * 50.0 / 3.5);
        assert!((trace.duration_hr() - expected_end).abs() <= 0.1);
        let cmax = trace.cmax_mg_l().unwrap();
        let last = *trace.conc_mg_per_l().last().unwrap();
        assert!(last < 0.05 * cmax, "terminal sample {last} vs cmax {cmax}");
    }

    #[test]
    fn explicit_horizon_is_respected() {
        let regimen = DosingRegimen::builder(500.0, 24.0, 1)
            .t_end(12.0)
            .build()
            .unwrap();
        let trace = simulate(&bolus_params(), &regimen, &PkConfig::default()).unwrap();
        assert_relative_eq!(trace.duration_hr(), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn oral_dosing_rises_then_falls() {
        let regimen = DosingRegimen::builder(500.0, 24.0, 1)
            .absorption_rate(0.8)
            .build()
            .unwrap();
        let params = PkParameters {
            clearance_l_per_hr: Some(3.5),
            volume_of_distribution_l: Some(50.0),
            ..Default::default()
        };
        let trace = simulate(&params, &regimen, &PkConfig::default()).unwrap();

        let cmax = trace.cmax_mg_l().unwrap();
        let peak_idx = trace
            .conc_mg_per_l()
            .iter()
            .position(|c| *c == cmax)
            .unwrap();
        assert!(peak_idx > 0, "oral peak should come after t = 0");
        assert!(trace.conc_mg_per_l()[0] < cmax);
        // default oral bioavailability halves systemic exposure:
        // AUC ≈ F × dose / CL
        assert_relative_eq!(
            trace.auc_mg_h_l(),
            0.5 * 500.0 / 3.5,
            max_relative = 0.05
        );
    }

    #[test]
    fn every_scheduled_dose_is_applied() {
        let regimen = DosingRegimen::builder(500.0, 12.0, 3).build().unwrap();
        let trace = simulate(&bolus_params(), &regimen, &PkConfig::default()).unwrap();

        // each later dose lands on top of residual drug, so local peaks climb
        let conc = trace.conc_mg_per_l();
        let c_second_peak = conc[(12.0_f64 / 0.1).round() as usize];
        let c_third_peak = conc[(24.0_f64 / 0.1).round() as usize];
        assert!(c_second_peak > conc[0]);
        assert!(c_third_peak > c_second_peak);
    }

    #[test]
    fn trace_is_truncated_to_cap() {
        let config = PkConfig::default().with_max_trace_samples(100);
        let trace = simulate(&bolus_params(), &single_bolus_regimen(), &config).unwrap();
        assert_eq!(trace.len(), 100);
        assert_relative_eq!(trace.duration_hr(), 9.9, epsilon = 1e-9);
    }

    #[test]
    fn missing_core_parameters_fail_fast() {
        let err = simulate(
            &PkParameters::default(),
            &single_bolus_regimen(),
            &PkConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SimulateError::InsufficientParameters {
                missing: vec!["clearance_l_per_hr", "volume_of_distribution_l"],
            }
        );
    }

    #[test]
    fn fallback_chain_runs_before_sufficiency_check() {
        // half-life and weight alone are enough: Vd from weight, CL derived
        let params = PkParameters {
            half_life_hr: Some(10.0),
            ..Default::default()
        };
        let regimen = DosingRegimen::builder(500.0, 24.0, 1)
            .body_weight(70.0)
            .build()
            .unwrap();
        let trace = simulate(&params, &regimen, &PkConfig::default()).unwrap();
        assert!(trace.cmax_mg_l().unwrap() > 0.0);
    }

    #[test]
    fn zero_volume_records_zero_concentration() {
        let params = PkParameters {
            clearance_l_per_hr: Some(3.5),
            volume_of_distribution_l: Some(0.0),
            ..Default::default()
        };
        let trace = simulate(&params, &single_bolus_regimen(), &PkConfig::default()).unwrap();
        assert!(trace.conc_mg_per_l().iter().all(|c| *c == 0.0));
    }
}
