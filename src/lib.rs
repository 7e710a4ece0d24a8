//! Pharmacokinetic dosing simulation and therapeutic-risk scoring.
//!
//! Given a drug's PK parameters (supplied directly, stored on a medication
//! record, or recovered best-effort from public drug-label services) and a
//! dosing regimen, this crate simulates plasma concentration over time,
//! derives exposure metrics, and scores how much of the exposure falls
//! below, within, or above a therapeutic band. A Cockcroft-Gault creatinine
//! clearance calculator supports dose individualization.
//!
//! The pipeline is resolve → simulate → evaluate:
//!
//! ```
//! use dosewise::prelude::*;
//!
//! let config = PkConfig::default();
//! let params = PkParameters {
//!     clearance_l_per_hr: Some(3.5),
//!     volume_of_distribution_l: Some(50.0),
//!     ..Default::default()
//! };
//! let regimen = DosingRegimen::builder(500.0, 24.0, 1).build()?;
//! let trace = simulate(&params, &regimen, &config)?;
//!
//! let window = TherapeuticWindow::new(1.0, 10.0)?;
//! let eval = evaluate(&trace, &window);
//! assert!((eval.pct_below + eval.pct_within + eval.pct_above - 100.0).abs() < 1e-6);
//! # Ok::<(), dosewise::DosewiseError>(())
//! ```
//!
//! The combined [`run::run`] flow ties the pieces together for callers that
//! own patient and medication records, handing the finished report to a
//! [`run::SimulationRecorder`] best-effort.

pub mod config;
pub mod error;
pub mod fetch;
pub mod params;
pub mod renal;
pub mod run;
pub mod simulator;
pub mod window;

pub use config::PkConfig;
pub use error::DosewiseError;
pub use fetch::{DrugDataFetcher, Extraction, PartialPkParameters};
pub use params::{DosingRegimen, PkParameters};
pub use simulator::{simulate, ConcentrationTrace};
pub use window::{evaluate, RiskLevel, TherapeuticWindow, WindowEvaluation};

pub mod prelude {
    pub use crate::config::PkConfig;
    pub use crate::error::DosewiseError;
    pub use crate::fetch::{
        DrugDataFetcher, Extraction, LabelSource, PartialPkParameters, StaticSource,
    };
    pub use crate::params::{resolve, resolve_with_fetcher, DosingRegimen, PkParameters};
    pub use crate::renal::creatinine_clearance;
    pub use crate::run::{
        run, ExposureSummary, Lookup, MedicationRecord, NullRecorder, PatientRecord,
        RecorderError, RunOutcome, RunReport, SimulationRecorder,
    };
    pub use crate::simulator::{simulate, ConcentrationTrace, SimulateError};
    pub use crate::window::{
        evaluate, evaluate_samples, RiskLevel, TherapeuticWindow, WindowEvaluation,
    };
}
