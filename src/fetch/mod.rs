//! External PK data fetching
//!
//! Best-effort extraction of pharmacokinetic parameters from public drug
//! information services. The entry point is [`DrugDataFetcher::fetch`],
//! which **never fails**: every network, parse, or missing-data condition
//! degrades to a per-field state instead of an error, because a failed
//! lookup must not abort a simulation.
//!
//! Each field carries an explicit [`Extraction`] state so callers can tell
//! "the source was read and said nothing" ([`Extraction::NotFound`]) apart
//! from "the source was never read" ([`Extraction::Unavailable`]).

mod extract;
pub mod providers;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PkConfig;
use crate::params::{PkParameters, LN_2};

pub use providers::{DailyMedLabels, LabelSource, PubChemRecords, SourceError, StaticSource};

/// Outcome of extracting one field from external sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Extraction<T> {
    /// The field was parsed out of a source's text
    Found(T),
    /// At least one source was read, but no pattern matched
    NotFound,
    /// No source could be read at all
    Unavailable,
}

impl<T> Extraction<T> {
    /// The extracted value, if any
    pub fn into_option(self) -> Option<T> {
        match self {
            Extraction::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found(_))
    }

    /// Keep-first merge: an earlier `Found` is never overwritten, and a
    /// source that was read ranks above one that was not.
    pub fn or(self, later: Self) -> Self {
        match (self, later) {
            (Extraction::Found(v), _) => Extraction::Found(v),
            (_, Extraction::Found(v)) => Extraction::Found(v),
            (Extraction::NotFound, _) | (_, Extraction::NotFound) => Extraction::NotFound,
            _ => Extraction::Unavailable,
        }
    }
}

/// PK parameters recovered from external sources, each field independently
/// present or absent, plus the raw section text per provider for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialPkParameters {
    pub half_life_hr: Extraction<f64>,
    pub clearance_l_per_hr: Extraction<f64>,
    pub volume_of_distribution_l: Extraction<f64>,
    pub bioavailability_f: Extraction<f64>,

    /// Provider name → raw extracted section text (`None` when the provider
    /// could not be read)
    pub sources: HashMap<String, Option<String>>,
}

impl PartialPkParameters {
    /// A result as if no source had been reachable
    pub fn unavailable() -> Self {
        Self {
            half_life_hr: Extraction::Unavailable,
            clearance_l_per_hr: Extraction::Unavailable,
            volume_of_distribution_l: Extraction::Unavailable,
            bioavailability_f: Extraction::Unavailable,
            sources: HashMap::new(),
        }
    }

    /// Collapse to plain optional parameters for the resolver
    pub fn to_parameters(&self) -> PkParameters {
        PkParameters {
            half_life_hr: self.half_life_hr.into_option(),
            clearance_l_per_hr: self.clearance_l_per_hr.into_option(),
            volume_of_distribution_l: self.volume_of_distribution_l.into_option(),
            bioavailability_f: self.bioavailability_f.into_option(),
        }
    }

    fn merge_fields(&mut self, other: &FieldSet) {
        self.half_life_hr = self.half_life_hr.or(other.half_life_hr);
        self.clearance_l_per_hr = self.clearance_l_per_hr.or(other.clearance_l_per_hr);
        self.volume_of_distribution_l = self
            .volume_of_distribution_l
            .or(other.volume_of_distribution_l);
        self.bioavailability_f = self.bioavailability_f.or(other.bioavailability_f);
    }
}

impl Default for PartialPkParameters {
    fn default() -> Self {
        Self::unavailable()
    }
}

struct FieldSet {
    half_life_hr: Extraction<f64>,
    clearance_l_per_hr: Extraction<f64>,
    volume_of_distribution_l: Extraction<f64>,
    bioavailability_f: Extraction<f64>,
}

impl FieldSet {
    fn unavailable() -> Self {
        Self {
            half_life_hr: Extraction::Unavailable,
            clearance_l_per_hr: Extraction::Unavailable,
            volume_of_distribution_l: Extraction::Unavailable,
            bioavailability_f: Extraction::Unavailable,
        }
    }

    fn parse(text: &str, reference_weight_kg: f64) -> Self {
        Self {
            half_life_hr: extract::half_life_hr(text),
            clearance_l_per_hr: extract::clearance_l_per_hr(text, reference_weight_kg),
            volume_of_distribution_l: extract::volume_of_distribution_l(
                text,
                reference_weight_kg,
            ),
            bioavailability_f: extract::bioavailability_f(text),
        }
    }
}

/// Fetches PK parameters from a fixed, ordered list of sources.
pub struct DrugDataFetcher {
    sources: Vec<Box<dyn LabelSource>>,
    reference_weight_kg: f64,
}

impl DrugDataFetcher {
    /// Fetcher over the default public providers, label service first.
    pub fn new(config: &PkConfig) -> Self {
        Self {
            sources: vec![
                Box::new(DailyMedLabels::new(config.fetch_timeout_secs)),
                Box::new(PubChemRecords::new(config.fetch_timeout_secs)),
            ],
            reference_weight_kg: config.reference_weight_kg,
        }
    }

    /// Fetcher over caller-supplied sources, in the given precedence order.
    pub fn with_sources(sources: Vec<Box<dyn LabelSource>>, config: &PkConfig) -> Self {
        Self {
            sources,
            reference_weight_kg: config.reference_weight_kg,
        }
    }

    /// Query every source in order and merge per field, first hit wins.
    ///
    /// After merging, a still-missing half-life is derived from Vd and
    /// clearance when both are known.
    pub fn fetch(&self, drug_name: &str) -> PartialPkParameters {
        let mut merged = PartialPkParameters::unavailable();

        for source in &self.sources {
            let (fields, raw) = match source.pharmacology_text(drug_name) {
                Ok(text) => {
                    debug!(
                        source = source.name(),
                        drug = drug_name,
                        chars = text.len(),
                        "read pharmacology text"
                    );
                    (FieldSet::parse(&text, self.reference_weight_kg), Some(text))
                }
                Err(err) => {
                    warn!(
                        source = source.name(),
                        drug = drug_name,
                        error = %err,
                        "drug data source unavailable"
                    );
                    (FieldSet::unavailable(), None)
                }
            };
            merged.merge_fields(&fields);
            merged.sources.insert(source.name().to_string(), raw);
        }

        if !merged.half_life_hr.is_found() {
            if let (Some(vd), Some(cl)) = (
                merged.volume_of_distribution_l.into_option(),
                merged.clearance_l_per_hr.into_option(),
            ) {
                if cl > 0.0 {
                    merged.half_life_hr = Extraction::Found(LN_2 * vd / cl);
                }
            }
        }

        merged
    }
}
