//! Crate-level error aggregation
//!
//! Each module carries its own `thiserror` enum; [`DosewiseError`] folds
//! them into one type for callers that drive the whole pipeline with `?`.
//! External fetch failures never appear here: the fetcher absorbs them into
//! per-field states by design.

use thiserror::Error;

use crate::params::RegimenError;
use crate::renal::RenalError;
use crate::run::RunError;
use crate::simulator::SimulateError;
use crate::window::WindowError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DosewiseError {
    #[error("renal function error: {0}")]
    Renal(#[from] RenalError),

    #[error("invalid dosing regimen: {0}")]
    Regimen(#[from] RegimenError),

    #[error("simulation error: {0}")]
    Simulate(#[from] SimulateError),

    #[error("therapeutic window error: {0}")]
    Window(#[from] WindowError),

    #[error("run error: {0}")]
    Run(#[from] RunError),
}
