//! Drug-information providers
//!
//! Each provider turns a drug name into the concatenated free text of its
//! pharmacology sections. Transport details stay behind the [`LabelSource`]
//! trait so the fetcher (and its tests) never depend on a live service.
//!
//! Two public services are implemented: the DailyMed SPL label service and
//! the PubChem PUG-View compound record. Both are strictly best-effort; any
//! transport or shape problem surfaces as a [`SourceError`] that the fetcher
//! downgrades to per-field "unavailable" states.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

const USER_AGENT: &str = concat!("dosewise/", env!("CARGO_PKG_VERSION"));

/// Errors a provider can report. Never escapes the fetcher.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport-level failure (connect, timeout, non-2xx)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service responded but knows no record for this drug name
    #[error("no record found for drug name")]
    NoRecord,

    /// The service responded with a payload we could not interpret
    #[error("unexpected response shape: {0}")]
    Malformed(String),

    /// The source is configured as offline (canned sources)
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// A named source of pharmacology free text.
pub trait LabelSource: Send + Sync {
    /// Stable provider name, used as the key of the audit `sources` map
    fn name(&self) -> &'static str;

    /// Concatenated text of all pharmacology sections for `drug_name`.
    ///
    /// `Ok` means the provider was reached and read; an empty string means
    /// it had no matching sections. `Err` means the source was never read.
    fn pharmacology_text(&self, drug_name: &str) -> Result<String, SourceError>;
}

/// Heading filter shared by all providers
pub(crate) fn is_pharmacology_heading(heading: &str) -> bool {
    let h = heading.to_ascii_lowercase();
    h.contains("pharmacokinetics") || h.contains("clinical pharmacology")
}

fn build_client(timeout_secs: u64) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to create HTTP client")
}

// ============================================================================
// DailyMed SPL labels
// ============================================================================

/// DailyMed structured product label service.
pub struct DailyMedLabels {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl DailyMedLabels {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            base_url: "https://dailymed.nlm.nih.gov/dailymed/services/v2".to_string(),
        }
    }

    /// Look up the first SPL set id for a drug name. The primary query is by
    /// label name; a generic search is tried when that returns nothing.
    fn search_setid(&self, drug_name: &str) -> Result<String, SourceError> {
        for params in [("drug_label_name", drug_name), ("search", drug_name)] {
            let body: Value = self
                .client
                .get(format!("{}/spls.json", self.base_url))
                .query(&[params])
                .send()?
                .error_for_status()?
                .json()?;
            let setid = body["data"]
                .as_array()
                .and_then(|items| items.first())
                .and_then(|item| item["setid"].as_str());
            if let Some(setid) = setid {
                return Ok(setid.to_string());
            }
        }
        Err(SourceError::NoRecord)
    }
}

impl LabelSource for DailyMedLabels {
    fn name(&self) -> &'static str {
        "dailymed"
    }

    fn pharmacology_text(&self, drug_name: &str) -> Result<String, SourceError> {
        let setid = self.search_setid(drug_name)?;
        let label: Value = self
            .client
            .get(format!("{}/spls/{}.json", self.base_url, setid))
            .send()?
            .error_for_status()?
            .json()?;

        let sections = label["data"]["sections"]
            .as_array()
            .ok_or_else(|| SourceError::Malformed("label has no sections array".into()))?;

        let texts: Vec<&str> = sections
            .iter()
            .filter(|sec| {
                sec["title"]
                    .as_str()
                    .is_some_and(is_pharmacology_heading)
            })
            .filter_map(|sec| sec["text"].as_str())
            .collect();
        Ok(texts.join("\n"))
    }
}

// ============================================================================
// PubChem PUG-View records
// ============================================================================

/// PubChem compound record service (PUG REST + PUG-View).
pub struct PubChemRecords {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl PubChemRecords {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            base_url: "https://pubchem.ncbi.nlm.nih.gov".to_string(),
        }
    }

    fn compound_id(&self, drug_name: &str) -> Result<i64, SourceError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Malformed("base url cannot carry a path".into()))?
            .extend(["rest", "pug", "compound", "name", drug_name, "cids", "JSON"]);

        let body: Value = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json()?;
        body["IdentifierList"]["CID"]
            .as_array()
            .and_then(|cids| cids.first())
            .and_then(Value::as_i64)
            .ok_or(SourceError::NoRecord)
    }

    /// Walk the section tree, collecting the display strings of every
    /// section whose heading is a pharmacology heading. Matching recurses
    /// into nested sections, so a PK subsection of "Drug and Medication
    /// Information" is still found.
    fn collect_section_text(section: &Value, acc: &mut Vec<String>) {
        let heading = section["TOCHeading"].as_str().unwrap_or_default();
        if is_pharmacology_heading(heading) {
            if let Some(infos) = section["Information"].as_array() {
                for info in infos {
                    if let Some(strings) = info["Value"]["StringWithMarkup"].as_array() {
                        for s in strings {
                            if let Some(text) = s["String"].as_str() {
                                acc.push(text.to_string());
                            }
                        }
                    }
                }
            }
        }
        if let Some(children) = section["Section"].as_array() {
            for child in children {
                Self::collect_section_text(child, acc);
            }
        }
    }
}

impl LabelSource for PubChemRecords {
    fn name(&self) -> &'static str {
        "pubchem"
    }

    fn pharmacology_text(&self, drug_name: &str) -> Result<String, SourceError> {
        let cid = self.compound_id(drug_name)?;
        let record: Value = self
            .client
            .get(format!(
                "{}/rest/pug_view/data/compound/{}/JSON",
                self.base_url, cid
            ))
            .send()?
            .error_for_status()?
            .json()?;

        let mut texts = Vec::new();
        if let Some(sections) = record["Record"]["Section"].as_array() {
            for section in sections {
                Self::collect_section_text(section, &mut texts);
            }
        }
        Ok(texts.join("\n"))
    }
}

// ============================================================================
// Canned source
// ============================================================================

/// A source backed by a fixed string, for tests and offline operation.
pub struct StaticSource {
    name: &'static str,
    text: Option<String>,
}

impl StaticSource {
    /// A source that always returns `text`
    pub fn new(name: &'static str, text: &str) -> Self {
        Self {
            name,
            text: Some(text.to_string()),
        }
    }

    /// A source that always fails, as an unreachable service would
    pub fn unavailable(name: &'static str) -> Self {
        Self { name, text: None }
    }
}

impl LabelSource for StaticSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn pharmacology_text(&self, _drug_name: &str) -> Result<String, SourceError> {
        self.text
            .clone()
            .ok_or_else(|| SourceError::Unavailable(format!("{} is offline", self.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_filter_is_case_insensitive_substring() {
        assert!(is_pharmacology_heading("Pharmacokinetics"));
        assert!(is_pharmacology_heading("12.3 PHARMACOKINETICS"));
        assert!(is_pharmacology_heading("Clinical Pharmacology"));
        assert!(!is_pharmacology_heading("Indications and Usage"));
    }

    #[test]
    fn static_source_round_trip() {
        let src = StaticSource::new("canned", "half-life of 4 hours");
        assert_eq!(src.name(), "canned");
        assert_eq!(
            src.pharmacology_text("anything").unwrap(),
            "half-life of 4 hours"
        );
    }

    #[test]
    fn unavailable_static_source_errors() {
        let src = StaticSource::unavailable("down");
        assert!(src.pharmacology_text("anything").is_err());
    }

    #[test]
    fn pubchem_section_walk_collects_nested_matches() {
        let record: serde_json::Value = serde_json::json!({
            "TOCHeading": "Drug and Medication Information",
            "Section": [{
                "TOCHeading": "Pharmacokinetics",
                "Information": [{
                    "Value": { "StringWithMarkup": [{ "String": "half-life of 8 days" }] }
                }]
            }]
        });
        let mut acc = Vec::new();
        PubChemRecords::collect_section_text(&record, &mut acc);
        assert_eq!(acc, vec!["half-life of 8 days".to_string()]);
    }
}
