//! PK parameter sets, dosing regimens, and parameter resolution
//!
//! [`PkParameters`] is the ephemeral, per-request parameter set the
//! simulator consumes. Individual fields are optional; [`resolve`] merges
//! explicit overrides, stored values, and fetched values in strict
//! precedence order and then fills remaining gaps with physiologically
//! conventional derivations. Whether the result is sufficient to simulate
//! is checked by the simulator, not here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PkConfig;
use crate::fetch::DrugDataFetcher;

/// ln(2) as conventionally rounded in clinical PK derivations.
///
/// Kept at three digits so derived values line up with the figures
/// clinicians compute by hand (`CL = 0.693 × Vd / t½`).
pub const LN_2: f64 = 0.693;

/// Default simulation step when a regimen does not set one
pub const DEFAULT_DT_HR: f64 = 0.1;

// ============================================================================
// Parameter set
// ============================================================================

/// A possibly incomplete set of PK parameters for one drug.
///
/// Invariant maintained by [`resolve`]: when half-life, clearance, and Vd
/// are all present they satisfy `clearance = LN_2 × Vd / half_life`,
/// because the missing member is always derived rather than validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PkParameters {
    pub half_life_hr: Option<f64>,
    pub clearance_l_per_hr: Option<f64>,
    pub volume_of_distribution_l: Option<f64>,
    pub bioavailability_f: Option<f64>,
}

impl PkParameters {
    /// Per-field merge, `self` taking precedence over `fallback`
    pub fn or(self, fallback: Self) -> Self {
        Self {
            half_life_hr: self.half_life_hr.or(fallback.half_life_hr),
            clearance_l_per_hr: self.clearance_l_per_hr.or(fallback.clearance_l_per_hr),
            volume_of_distribution_l: self
                .volume_of_distribution_l
                .or(fallback.volume_of_distribution_l),
            bioavailability_f: self.bioavailability_f.or(fallback.bioavailability_f),
        }
    }

    /// True when clearance and Vd are both present, the minimum the
    /// simulator needs
    pub fn is_simulatable(&self) -> bool {
        self.clearance_l_per_hr.is_some() && self.volume_of_distribution_l.is_some()
    }

    /// True when every field is present
    pub fn is_complete(&self) -> bool {
        self.half_life_hr.is_some()
            && self.clearance_l_per_hr.is_some()
            && self.volume_of_distribution_l.is_some()
            && self.bioavailability_f.is_some()
    }

    /// Names of the core fields still missing for simulation
    pub fn missing_core_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.clearance_l_per_hr.is_none() {
            missing.push("clearance_l_per_hr");
        }
        if self.volume_of_distribution_l.is_none() {
            missing.push("volume_of_distribution_l");
        }
        missing
    }
}

// ============================================================================
// Dosing regimen
// ============================================================================

/// Errors from regimen construction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegimenError {
    #[error("{field} must be > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("num_doses must be >= 1")]
    NoDoses,
}

/// An immutable multi-dose regimen. Built through [`DosingRegimen::builder`],
/// which validates all fields on `build()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DosingRegimen {
    dose_mg: f64,
    interval_hr: f64,
    num_doses: usize,
    absorption_rate_hr: Option<f64>,
    body_weight_kg: Option<f64>,
    t_end_hr: Option<f64>,
    dt_hr: f64,
}

impl DosingRegimen {
    /// Start building a regimen from its required fields
    pub fn builder(dose_mg: f64, interval_hr: f64, num_doses: usize) -> RegimenBuilder {
        RegimenBuilder {
            dose_mg,
            interval_hr,
            num_doses,
            absorption_rate_hr: None,
            body_weight_kg: None,
            t_end_hr: None,
            dt_hr: DEFAULT_DT_HR,
        }
    }

    pub fn dose_mg(&self) -> f64 {
        self.dose_mg
    }

    pub fn interval_hr(&self) -> f64 {
        self.interval_hr
    }

    pub fn num_doses(&self) -> usize {
        self.num_doses
    }

    /// ka; absent means instantaneous/IV dosing
    pub fn absorption_rate_hr(&self) -> Option<f64> {
        self.absorption_rate_hr
    }

    pub fn body_weight_kg(&self) -> Option<f64> {
        self.body_weight_kg
    }

    /// Explicit simulation horizon, when the caller wants one
    pub fn t_end_hr(&self) -> Option<f64> {
        self.t_end_hr
    }

    pub fn dt_hr(&self) -> f64 {
        self.dt_hr
    }

    /// Copy of this regimen with the body weight filled in when absent.
    /// Non-positive weights are ignored, keeping the build-time invariant.
    pub(crate) fn or_body_weight(mut self, weight_kg: Option<f64>) -> Self {
        if self.body_weight_kg.is_none() {
            self.body_weight_kg = weight_kg.filter(|w| *w > 0.0);
        }
        self
    }
}

/// Builder for [`DosingRegimen`]
pub struct RegimenBuilder {
    dose_mg: f64,
    interval_hr: f64,
    num_doses: usize,
    absorption_rate_hr: Option<f64>,
    body_weight_kg: Option<f64>,
    t_end_hr: Option<f64>,
    dt_hr: f64,
}

impl RegimenBuilder {
    /// Set the absorption rate constant ka (extravascular dosing)
    pub fn absorption_rate(mut self, ka_per_hr: f64) -> Self {
        self.absorption_rate_hr = Some(ka_per_hr);
        self
    }

    /// Set the patient body weight, enabling the weight-based Vd fallback
    pub fn body_weight(mut self, weight_kg: f64) -> Self {
        self.body_weight_kg = Some(weight_kg);
        self
    }

    /// Set an explicit simulation horizon
    pub fn t_end(mut self, t_end_hr: f64) -> Self {
        self.t_end_hr = Some(t_end_hr);
        self
    }

    /// Set the integration step (default 0.1 h)
    pub fn dt(mut self, dt_hr: f64) -> Self {
        self.dt_hr = dt_hr;
        self
    }

    pub fn build(self) -> Result<DosingRegimen, RegimenError> {
        fn positive(field: &'static str, value: f64) -> Result<(), RegimenError> {
            if value > 0.0 {
                Ok(())
            } else {
                Err(RegimenError::NonPositive { field, value })
            }
        }

        positive("dose_mg", self.dose_mg)?;
        positive("interval_hr", self.interval_hr)?;
        positive("dt_hr", self.dt_hr)?;
        if self.num_doses < 1 {
            return Err(RegimenError::NoDoses);
        }
        if let Some(ka) = self.absorption_rate_hr {
            positive("absorption_rate_hr", ka)?;
        }
        if let Some(wt) = self.body_weight_kg {
            positive("body_weight_kg", wt)?;
        }
        if let Some(t_end) = self.t_end_hr {
            positive("t_end_hr", t_end)?;
        }

        Ok(DosingRegimen {
            dose_mg: self.dose_mg,
            interval_hr: self.interval_hr,
            num_doses: self.num_doses,
            absorption_rate_hr: self.absorption_rate_hr,
            body_weight_kg: self.body_weight_kg,
            t_end_hr: self.t_end_hr,
            dt_hr: self.dt_hr,
        })
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Merge parameter layers and fill gaps with derived defaults.
///
/// Precedence per field: `overrides` > `stored` > `fetched`. The fallback
/// chain then runs in a fixed order:
///
/// 1. bioavailability — 0.5 for extravascular dosing (ka present),
///    otherwise 1.0;
/// 2. volume of distribution — `vd_l_per_kg × body_weight` when the
///    regimen carries a weight;
/// 3. clearance — `LN_2 × Vd / half_life` when both are known.
///
/// The order matters: a weight-derived Vd can feed the clearance
/// derivation.
pub fn resolve(
    overrides: PkParameters,
    stored: PkParameters,
    fetched: PkParameters,
    regimen: &DosingRegimen,
    config: &PkConfig,
) -> PkParameters {
    apply_defaults(overrides.or(stored).or(fetched), regimen, config)
}

/// The derivation half of [`resolve`], applied to an already-merged set
pub fn apply_defaults(
    mut params: PkParameters,
    regimen: &DosingRegimen,
    config: &PkConfig,
) -> PkParameters {
    if params.bioavailability_f.is_none() {
        params.bioavailability_f = Some(if regimen.absorption_rate_hr().is_some() {
            config.oral_bioavailability
        } else {
            config.iv_bioavailability
        });
    }

    if params.volume_of_distribution_l.is_none() {
        if let Some(weight) = regimen.body_weight_kg() {
            params.volume_of_distribution_l = Some(config.vd_l_per_kg * weight);
        }
    }

    if params.clearance_l_per_hr.is_none() {
        if let (Some(half), Some(vd)) = (params.half_life_hr, params.volume_of_distribution_l) {
            if half > 0.0 {
                params.clearance_l_per_hr = Some(LN_2 * vd / half);
            }
        }
    }

    params
}

/// [`resolve`] with the fetched layer produced on demand: the external
/// lookup runs only when overrides and stored values leave a gap.
pub fn resolve_with_fetcher(
    overrides: PkParameters,
    stored: PkParameters,
    drug_name: &str,
    fetcher: &DrugDataFetcher,
    regimen: &DosingRegimen,
    config: &PkConfig,
) -> PkParameters {
    let known = overrides.or(stored);
    let fetched = if known.is_complete() {
        PkParameters::default()
    } else {
        fetcher.fetch(drug_name).to_parameters()
    };
    apply_defaults(known.or(fetched), regimen, config)
}
