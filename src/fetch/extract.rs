//! Free-text extraction of PK parameters
//!
//! Stateless regex parsing over the raw pharmacology blob returned by a
//! provider. Each function looks for one parameter and normalizes its unit;
//! failures are independent, so a blob with an unparseable clearance can
//! still yield a bioavailability.
//!
//! The patterns deliberately forbid digits, newlines, and colons between the
//! keyword and the number, so a "Half-life:" table-of-contents label never
//! swallows a value from an unrelated sentence.

use lazy_static::lazy_static;
use regex::Regex;

use super::Extraction;

lazy_static! {
    static ref HALF_LIFE: Regex = Regex::new(
        r"(?i)half[ -]?life[^0-9\n\r:]*?([0-9]+(?:\.[0-9]+)?)\s*(hours?|hrs?|h|days?|d|weeks?|wks?)\b"
    )
    .expect("half-life pattern");
    static ref CLEARANCE: Regex = Regex::new(
        r"(?i)clearance[^0-9\n\r:]*?([0-9]+(?:\.[0-9]+)?)\s*(mL/min/kg|mL/min|L/hr?/kg|L/hr?)"
    )
    .expect("clearance pattern");
    static ref VOLUME: Regex = Regex::new(
        r"(?i)\b(?:volume of distribution|vd)\b[^0-9\n\r:]*?([0-9]+(?:\.[0-9]+)?)\s*(L/kg|L|liters?)\b"
    )
    .expect("volume of distribution pattern");
    static ref BIOAVAILABILITY: Regex = Regex::new(
        r"(?i)\b(?:absolute\s+)?bioavailability[^0-9\n\r:]*?([0-9]+(?:\.[0-9]+)?)\s*%?"
    )
    .expect("bioavailability pattern");
}

/// Half-life in hours. Accepts hour, day, and week units.
pub(crate) fn half_life_hr(text: &str) -> Extraction<f64> {
    let Some(caps) = HALF_LIFE.captures(text) else {
        return Extraction::NotFound;
    };
    let Ok(value) = caps[1].parse::<f64>() else {
        return Extraction::NotFound;
    };
    let unit = caps[2].to_ascii_lowercase();
    let hours = if unit.starts_with('h') {
        value
    } else if unit.starts_with('d') {
        value * 24.0
    } else {
        value * 168.0
    };
    Extraction::Found(hours)
}

/// Clearance in L/hr. Per-kg units are scaled by `reference_weight_kg`.
pub(crate) fn clearance_l_per_hr(text: &str, reference_weight_kg: f64) -> Extraction<f64> {
    let Some(caps) = CLEARANCE.captures(text) else {
        return Extraction::NotFound;
    };
    let Ok(value) = caps[1].parse::<f64>() else {
        return Extraction::NotFound;
    };
    let unit = caps[2].to_ascii_lowercase();
    let l_per_hr = match unit.as_str() {
        "ml/min" => value * 60.0 / 1000.0,
        "ml/min/kg" => value * reference_weight_kg * 60.0 / 1000.0,
        u if u.ends_with("/kg") => value * reference_weight_kg,
        _ => value,
    };
    Extraction::Found(l_per_hr)
}

/// Volume of distribution in L. `L/kg` is scaled by `reference_weight_kg`.
pub(crate) fn volume_of_distribution_l(text: &str, reference_weight_kg: f64) -> Extraction<f64> {
    let Some(caps) = VOLUME.captures(text) else {
        return Extraction::NotFound;
    };
    let Ok(value) = caps[1].parse::<f64>() else {
        return Extraction::NotFound;
    };
    let liters = if caps[2].to_ascii_lowercase() == "l/kg" {
        value * reference_weight_kg
    } else {
        value
    };
    Extraction::Found(liters)
}

/// Bioavailability as a fraction. Values above 1 are read as percentages.
pub(crate) fn bioavailability_f(text: &str) -> Extraction<f64> {
    let Some(caps) = BIOAVAILABILITY.captures(text) else {
        return Extraction::NotFound;
    };
    let Ok(value) = caps[1].parse::<f64>() else {
        return Extraction::NotFound;
    };
    let fraction = if value > 1.0 { value / 100.0 } else { value };
    Extraction::Found(fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn found(e: Extraction<f64>) -> f64 {
        match e {
            Extraction::Found(v) => v,
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn half_life_in_hours() {
        let v = found(half_life_hr("The elimination half-life is approximately 6.5 hours."));
        assert_relative_eq!(v, 6.5);
    }

    #[test]
    fn half_life_in_days_normalized() {
        let v = found(half_life_hr("a terminal half-life of 8 days"));
        assert_relative_eq!(v, 192.0);
    }

    #[test]
    fn half_life_in_weeks_normalized() {
        let v = found(half_life_hr("half-life near 2 weeks in poor metabolizers"));
        assert_relative_eq!(v, 336.0);
    }

    #[test]
    fn half_life_label_with_colon_is_ignored() {
        assert_eq!(half_life_hr("Half-life: see table 3"), Extraction::NotFound);
    }

    #[test]
    fn clearance_ml_per_min() {
        let v = found(clearance_l_per_hr("total clearance was 100 mL/min", 70.0));
        assert_relative_eq!(v, 6.0);
    }

    #[test]
    fn clearance_per_kg_uses_reference_weight() {
        let v = found(clearance_l_per_hr("plasma clearance of 1 mL/min/kg", 70.0));
        assert_relative_eq!(v, 4.2);
        let v = found(clearance_l_per_hr("clearance is 0.1 L/h/kg", 70.0));
        assert_relative_eq!(v, 7.0);
    }

    #[test]
    fn clearance_l_per_hr_passthrough() {
        let v = found(clearance_l_per_hr("systemic clearance averaged 3.5 L/h", 70.0));
        assert_relative_eq!(v, 3.5);
    }

    #[test]
    fn volume_absolute_and_per_kg() {
        let v = found(volume_of_distribution_l("volume of distribution is 42 L", 70.0));
        assert_relative_eq!(v, 42.0);
        let v = found(volume_of_distribution_l("Vd of 0.7 L/kg at steady state", 70.0));
        assert_relative_eq!(v, 49.0);
    }

    #[test]
    fn bioavailability_percent_and_fraction() {
        let v = found(bioavailability_f("absolute bioavailability of 50%"));
        assert_relative_eq!(v, 0.5);
        let v = found(bioavailability_f("oral bioavailability is 0.85 in adults"));
        assert_relative_eq!(v, 0.85);
    }

    #[test]
    fn fields_are_independent() {
        let blob = "clearance data not reported; bioavailability of 92%";
        assert_eq!(clearance_l_per_hr(blob, 70.0), Extraction::NotFound);
        assert_relative_eq!(found(bioavailability_f(blob)), 0.92);
    }
}
