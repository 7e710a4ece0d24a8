//! Combined simulation run flow
//!
//! The entry point for persistence-owning callers: given a patient and a
//! medication record, fill the patient's renal function where derivable,
//! resolve PK parameters from the medication's stored fields (consulting the
//! external fetcher only when they are incomplete), simulate the regimen,
//! evaluate against the medication's therapeutic band (or the configured
//! fallback band when its bounds are absent or unusable), and hand the
//! finished report to a [`SimulationRecorder`].
//!
//! Recording is best-effort: a recorder failure is logged and noted on the
//! report, never allowed to destroy the computed trace and evaluation.
//! Record lookup belongs to the caller; absent records arrive as
//! [`Lookup::NotFound`] and leave as [`RunOutcome`] variants, not errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PkConfig;
use crate::fetch::DrugDataFetcher;
use crate::params::{self, DosingRegimen, PkParameters};
use crate::renal;
use crate::simulator::{self, ConcentrationTrace, SimulateError};
use crate::window::{self, WindowEvaluation};

/// Errors a combined run can fail with. Missing records are not errors;
/// see [`RunOutcome`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    #[error(transparent)]
    Simulate(#[from] SimulateError),
}

/// A recorder's failure report. Carried back on the [`RunReport`].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("recorder failed: {0}")]
pub struct RecorderError(pub String);

// ============================================================================
// Records
// ============================================================================

/// The patient fields the run flow reads. Owned and persisted elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub name: String,
    pub age: Option<f64>,
    pub sex: Option<String>,
    pub weight_kg: Option<f64>,
    pub serum_creatinine_mg_dl: Option<f64>,
    pub creatinine_clearance_ml_min: Option<f64>,
}

impl PatientRecord {
    /// Fill a missing stored creatinine clearance from the record's own
    /// fields. A no-op when a value is already stored, when any input is
    /// missing, or when the inputs are invalid. Persisting the filled value
    /// is the caller's concern.
    pub fn ensure_creatinine_clearance(&mut self) {
        if self.creatinine_clearance_ml_min.is_some() {
            return;
        }
        let (Some(age), Some(sex), Some(weight), Some(scr)) = (
            self.age,
            self.sex.as_deref(),
            self.weight_kg,
            self.serum_creatinine_mg_dl,
        ) else {
            return;
        };
        match renal::creatinine_clearance(age, weight, scr, sex) {
            Ok(crcl) => self.creatinine_clearance_ml_min = Some(crcl),
            Err(err) => debug!(patient = %self.name, error = %err, "could not derive crcl"),
        }
    }
}

/// The medication fields the run flow reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub name: String,
    pub half_life_hr: Option<f64>,
    pub clearance_l_per_hr: Option<f64>,
    pub volume_of_distribution_l: Option<f64>,
    pub bioavailability_f: Option<f64>,
    pub therapeutic_window_lower_mg_l: Option<f64>,
    pub therapeutic_window_upper_mg_l: Option<f64>,
}

impl MedicationRecord {
    /// The stored PK fields as a parameter layer for the resolver
    pub fn stored_parameters(&self) -> PkParameters {
        PkParameters {
            half_life_hr: self.half_life_hr,
            clearance_l_per_hr: self.clearance_l_per_hr,
            volume_of_distribution_l: self.volume_of_distribution_l,
            bioavailability_f: self.bioavailability_f,
        }
    }

    /// The medication's own band, when both bounds are present and usable
    fn usable_window_bounds(&self) -> Option<(f64, f64)> {
        let (Some(lower), Some(upper)) = (
            self.therapeutic_window_lower_mg_l,
            self.therapeutic_window_upper_mg_l,
        ) else {
            return None;
        };
        (lower > 0.0 && upper > lower).then_some((lower, upper))
    }
}

/// Result of a record lookup performed by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Exposure metrics summarizing a trace for storage and display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureSummary {
    pub cmax_mg_l: Option<f64>,
    pub cmin_mg_l: Option<f64>,
    pub auc_mg_h_l: f64,
    pub duration_hr: f64,
}

impl ExposureSummary {
    pub fn from_trace(trace: &ConcentrationTrace) -> Self {
        Self {
            cmax_mg_l: trace.cmax_mg_l(),
            cmin_mg_l: trace.cmin_mg_l(),
            auc_mg_h_l: trace.auc_mg_h_l(),
            duration_hr: trace.duration_hr(),
        }
    }
}

/// Everything a completed run produced.
///
/// `too_high`/`too_low` flag *any* excursion out of the band
/// (`pct_above > 0` / `pct_below > 0`); they answer a different question
/// than the evaluation's tiered [`risk_level`](WindowEvaluation), which only
/// escalates on clinically significant excursions. Both are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub params_used: PkParameters,
    pub crcl_ml_min: Option<f64>,
    pub window_lower_mg_l: f64,
    pub window_upper_mg_l: f64,
    pub trace: ConcentrationTrace,
    pub evaluation: WindowEvaluation,
    pub summary: ExposureSummary,
    pub too_high: bool,
    pub too_low: bool,
    /// Set when the recorder rejected the report; the results above are
    /// complete regardless
    pub recorder_error: Option<String>,
}

/// Typed outcome of a combined run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Box<RunReport>),
    PatientNotFound,
    MedicationNotFound,
}

impl RunOutcome {
    /// The report, when the run completed
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

// ============================================================================
// Recorder seam
// ============================================================================

/// Persistence seam for completed runs. Implementations own storage; the
/// run flow treats them as best-effort and keeps its results on failure.
pub trait SimulationRecorder {
    fn record(&mut self, report: &RunReport) -> Result<(), RecorderError>;
}

/// Recorder that stores nothing, for callers without a persistence layer.
pub struct NullRecorder;

impl SimulationRecorder for NullRecorder {
    fn record(&mut self, _report: &RunReport) -> Result<(), RecorderError> {
        Ok(())
    }
}

// ============================================================================
// Run flow
// ============================================================================

/// Resolve, simulate, evaluate, and record one dosing scenario.
///
/// The regimen's body weight defaults to the patient's when unset, so
/// weight-based fallbacks see the same weight everywhere. The external
/// fetcher is consulted only when the medication's stored fields leave the
/// parameter set incomplete.
pub fn run(
    patient: Lookup<PatientRecord>,
    medication: Lookup<MedicationRecord>,
    regimen: &DosingRegimen,
    fetcher: &DrugDataFetcher,
    config: &PkConfig,
    recorder: &mut dyn SimulationRecorder,
) -> Result<RunOutcome, RunError> {
    let Lookup::Found(mut patient) = patient else {
        return Ok(RunOutcome::PatientNotFound);
    };
    let Lookup::Found(medication) = medication else {
        return Ok(RunOutcome::MedicationNotFound);
    };

    patient.ensure_creatinine_clearance();

    let regimen = regimen.or_body_weight(patient.weight_kg);
    let params_used = params::resolve_with_fetcher(
        PkParameters::default(),
        medication.stored_parameters(),
        &medication.name,
        fetcher,
        &regimen,
        config,
    );
    debug!(drug = %medication.name, ?params_used, "parameters resolved");

    let trace = simulator::simulate(&params_used, &regimen, config)?;

    let (lower, upper) = medication.usable_window_bounds().unwrap_or((
        config.fallback_window_lower_mg_l,
        config.fallback_window_upper_mg_l,
    ));
    let evaluation = window::evaluate_samples(trace.times_hr(), trace.conc_mg_per_l(), lower, upper);
    let summary = ExposureSummary::from_trace(&trace);

    info!(
        drug = %medication.name,
        samples = trace.len(),
        risk = %evaluation.risk_level,
        "simulation evaluated"
    );

    let mut report = RunReport {
        params_used,
        crcl_ml_min: patient.creatinine_clearance_ml_min,
        window_lower_mg_l: lower,
        window_upper_mg_l: upper,
        too_high: evaluation.pct_above > 0.0,
        too_low: evaluation.pct_below > 0.0,
        trace,
        evaluation,
        summary,
        recorder_error: None,
    };

    if let Err(err) = recorder.record(&report) {
        warn!(drug = %medication.name, error = %err, "recorder failed; keeping results");
        report.recorder_error = Some(err.to_string());
    }

    Ok(RunOutcome::Completed(Box::new(report)))
}
