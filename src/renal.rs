//! Renal function estimation
//!
//! Creatinine clearance via the Cockcroft-Gault equation, used for dose
//! individualization. Pure math on validated inputs, no side effects.

use thiserror::Error;

/// Errors from renal function calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenalError {
    /// Serum creatinine must be strictly positive
    #[error("serum creatinine must be > 0 mg/dL, got {0}")]
    NonPositiveCreatinine(f64),
}

/// Estimate creatinine clearance (mL/min) with Cockcroft-Gault.
///
/// `crcl = ((140 − age) × weight) / (72 × serum_creatinine)`, multiplied by
/// 0.85 when `sex` normalizes to female (`"F"` or `"FEMALE"`,
/// case-insensitive, surrounding whitespace ignored).
///
/// # Example
///
/// ```
/// use dosewise::renal::creatinine_clearance;
///
/// let crcl = creatinine_clearance(50.0, 70.0, 1.0, "M").unwrap();
/// assert!((crcl - 87.5).abs() < 1e-9);
/// ```
pub fn creatinine_clearance(
    age: f64,
    weight_kg: f64,
    serum_creatinine_mg_dl: f64,
    sex: &str,
) -> Result<f64, RenalError> {
    if serum_creatinine_mg_dl <= 0.0 {
        return Err(RenalError::NonPositiveCreatinine(serum_creatinine_mg_dl));
    }

    let mut crcl = ((140.0 - age) * weight_kg) / (72.0 * serum_creatinine_mg_dl);
    if is_female(sex) {
        crcl *= 0.85;
    }
    Ok(crcl)
}

#[inline]
fn is_female(sex: &str) -> bool {
    matches!(
        sex.trim().to_ascii_uppercase().as_str(),
        "F" | "FEMALE"
    )
}
