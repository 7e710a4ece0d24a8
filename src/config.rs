//! Crate-wide configuration
//!
//! [`PkConfig`] gathers the physiological defaults and operational limits
//! that the resolver, simulator, evaluator, and fetcher consult. Everything
//! here has a clinically conventional default, and every value can be
//! overridden with the `with_*` builders so tests and callers are never
//! pinned to hidden constants.

use serde::{Deserialize, Serialize};

/// Configuration shared across parameter resolution, simulation,
/// window evaluation, and external data fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkConfig {
    /// Reference body weight for normalizing per-kg literature values
    /// (default: 70.0 kg)
    pub reference_weight_kg: f64,

    /// Volume of distribution per kg used when Vd is otherwise unresolved
    /// and the patient's weight is known (default: 0.6 L/kg)
    pub vd_l_per_kg: f64,

    /// Default bioavailability for extravascular dosing, i.e. when an
    /// absorption rate constant is supplied (default: 0.5)
    pub oral_bioavailability: f64,

    /// Default bioavailability for instantaneous/IV dosing (default: 1.0)
    pub iv_bioavailability: f64,

    /// Lower bound of the fallback therapeutic band used by the combined
    /// run flow when a medication carries no usable bounds (default: 1.0 mg/L)
    pub fallback_window_lower_mg_l: f64,

    /// Upper bound of the fallback therapeutic band (default: 10.0 mg/L)
    pub fallback_window_upper_mg_l: f64,

    /// Maximum number of samples a trace may carry when handed to callers;
    /// trailing samples beyond this are truncated (default: 5000)
    pub max_trace_samples: usize,

    /// Timeout applied to every external HTTP request (default: 8 s)
    pub fetch_timeout_secs: u64,
}

impl Default for PkConfig {
    fn default() -> Self {
        Self {
            reference_weight_kg: 70.0,
            vd_l_per_kg: 0.6,
            oral_bioavailability: 0.5,
            iv_bioavailability: 1.0,
            fallback_window_lower_mg_l: 1.0,
            fallback_window_upper_mg_l: 10.0,
            max_trace_samples: 5000,
            fetch_timeout_secs: 8,
        }
    }
}

impl PkConfig {
    /// Set the reference body weight for per-kg unit normalization
    pub fn with_reference_weight(mut self, weight_kg: f64) -> Self {
        self.reference_weight_kg = weight_kg;
        self
    }

    /// Set the weight-based volume of distribution fallback
    pub fn with_vd_per_kg(mut self, vd_l_per_kg: f64) -> Self {
        self.vd_l_per_kg = vd_l_per_kg;
        self
    }

    /// Set the fallback therapeutic band for the combined run flow
    pub fn with_fallback_window(mut self, lower_mg_l: f64, upper_mg_l: f64) -> Self {
        self.fallback_window_lower_mg_l = lower_mg_l;
        self.fallback_window_upper_mg_l = upper_mg_l;
        self
    }

    /// Set the trace sample cap
    pub fn with_max_trace_samples(mut self, cap: usize) -> Self {
        self.max_trace_samples = cap;
        self
    }

    /// Set the HTTP timeout for external lookups
    pub fn with_fetch_timeout(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }
}
