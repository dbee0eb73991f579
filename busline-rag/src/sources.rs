//! Chunk builder: turns the structured travel datasets into retrieval sentences.
//!
//! Two files feed the builder:
//!
//! - `bus_data.json`: districts with their dropping points and prices, and
//!   bus providers with the districts they cover.
//! - `privacy_policy.json`: one record per operator privacy policy.
//!
//! Every chunk is a full sentence that reads on its own, so any single hit
//! can be handed to the generator without its neighbours.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::document::Chunk;
use crate::error::{RagError, Result};

/// File name of the district and provider dataset inside a data directory.
pub const BUS_DATA_FILE: &str = "bus_data.json";
/// File name of the privacy policy dataset inside a data directory.
pub const PRIVACY_POLICY_FILE: &str = "privacy_policy.json";

/// A dataset that can describe itself as an ordered list of chunks.
pub trait ChunkSource {
    /// Produce chunks in a deterministic order.
    fn chunks(&self) -> Vec<Chunk>;
}

/// District fares and provider coverage.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BusData {
    /// Districts with their dropping points.
    #[serde(default)]
    pub districts: Vec<District>,
    /// Bus companies and where they run.
    #[serde(default)]
    pub bus_providers: Vec<BusProvider>,
}

/// A district and the fares to its dropping points.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct District {
    /// District name.
    pub name: String,
    /// Stops in the district, in file order.
    #[serde(default)]
    pub dropping_points: Vec<DroppingPoint>,
}

/// A stop with its ticket price.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DroppingPoint {
    /// Stop name.
    pub name: String,
    /// Ticket price in BDT.
    pub price: f64,
}

/// A bus company and the districts it serves.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BusProvider {
    /// Company name.
    pub name: String,
    /// Districts served; an empty list produces no chunk.
    #[serde(default)]
    pub coverage_districts: Vec<String>,
}

/// Operator privacy policies.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PrivacyPolicies {
    /// One record per operator.
    #[serde(default, rename = "privacyPolicies")]
    pub privacy_policies: Vec<PrivacyPolicy>,
}

/// One operator's privacy policy. Missing fields read as empty strings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivacyPolicy {
    /// Operator name.
    pub company: String,
    /// Policy summary.
    pub description: String,
    /// Phone number or email.
    pub contact: String,
    /// Office address.
    pub address: String,
    /// URL of the full policy.
    pub policy_link: String,
}

impl ChunkSource for BusData {
    fn chunks(&self) -> Vec<Chunk> {
        let fares = self.districts.iter().flat_map(|district| {
            district.dropping_points.iter().map(move |point| {
                Chunk::new(format!(
                    "In {}, the bus ticket to {} costs {} BDT.",
                    district.name, point.name, point.price
                ))
                .with_title(district.name.clone())
                .with_source("districts")
            })
        });

        let coverage = self.bus_providers.iter().filter(|p| !p.coverage_districts.is_empty()).map(
            |provider| {
                Chunk::new(format!(
                    "The bus company {} operates in the following districts: {}.",
                    provider.name,
                    provider.coverage_districts.join(", ")
                ))
                .with_title(provider.name.clone())
                .with_source("providers")
            },
        );

        fares.chain(coverage).collect()
    }
}

impl ChunkSource for PrivacyPolicies {
    fn chunks(&self) -> Vec<Chunk> {
        self.privacy_policies
            .iter()
            .map(|policy| {
                Chunk::new(format!(
                    "{} Privacy Policy: {} You can contact them at {} or visit {}. \
                     Their office is located at {}.",
                    policy.company,
                    policy.description,
                    policy.contact,
                    policy.policy_link,
                    policy.address
                ))
                .with_title(policy.company.clone())
                .with_source("policies")
            })
            .collect()
    }
}

/// Both datasets, loaded from one data directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelDataset {
    /// Contents of `bus_data.json`.
    pub bus: BusData,
    /// Contents of `privacy_policy.json`.
    pub policies: PrivacyPolicies,
}

impl TravelDataset {
    /// Load `bus_data.json` and `privacy_policy.json` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::SourceError`] naming the file that is missing or
    /// does not match the expected structure.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let bus = read_json(&dir.join(BUS_DATA_FILE))?;
        let policies = read_json(&dir.join(PRIVACY_POLICY_FILE))?;
        Ok(Self { bus, policies })
    }
}

impl ChunkSource for TravelDataset {
    fn chunks(&self) -> Vec<Chunk> {
        let mut chunks = self.bus.chunks();
        chunks.extend(self.policies.chunks());
        chunks
    }
}

/// Load both datasets from `dir` and return their chunks in build order.
pub fn prepare_chunks(dir: impl AsRef<Path>) -> Result<Vec<Chunk>> {
    let chunks = TravelDataset::load(dir)?.chunks();
    debug!(chunk_count = chunks.len(), "prepared chunks");
    Ok(chunks)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let source_error = |message: String| RagError::SourceError { path: PathBuf::from(path), message };
    let raw = fs::read_to_string(path).map_err(|e| source_error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| source_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bus() -> BusData {
        serde_json::from_str(
            r#"{
                "districts": [
                    {"name": "Khulna", "dropping_points": [
                        {"name": "Daulatpur", "price": 100},
                        {"name": "Sonadanga", "price": 120.5}
                    ]},
                    {"name": "Sylhet", "dropping_points": []}
                ],
                "bus_providers": [
                    {"name": "Hanif", "coverage_districts": ["Dhaka", "Sylhet"]},
                    {"name": "Ghost", "coverage_districts": []}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn fare_and_coverage_sentences() {
        let texts: Vec<String> = sample_bus().chunks().into_iter().map(|c| c.text).collect();
        assert_eq!(
            texts,
            vec![
                "In Khulna, the bus ticket to Daulatpur costs 100 BDT.",
                "In Khulna, the bus ticket to Sonadanga costs 120.5 BDT.",
                "The bus company Hanif operates in the following districts: Dhaka, Sylhet.",
            ]
        );
    }

    #[test]
    fn policy_sentence_includes_every_field() {
        let policies: PrivacyPolicies = serde_json::from_str(
            r#"{"privacyPolicies": [{
                "company": "Green Line",
                "description": "We keep passenger data private.",
                "contact": "info@greenline.example",
                "address": "Dhaka",
                "policyLink": "https://greenline.example/privacy"
            }]}"#,
        )
        .unwrap();
        let chunk = &policies.chunks()[0];
        assert_eq!(
            chunk.text,
            "Green Line Privacy Policy: We keep passenger data private. You can contact them at \
             info@greenline.example or visit https://greenline.example/privacy. Their office is \
             located at Dhaka."
        );
        assert_eq!(chunk.source.as_deref(), Some("policies"));
        assert_eq!(chunk.title.as_deref(), Some("Green Line"));
    }

    #[test]
    fn chunk_order_is_stable() {
        let dataset = TravelDataset { bus: sample_bus(), policies: PrivacyPolicies::default() };
        assert_eq!(dataset.chunks(), dataset.chunks());
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare_chunks(dir.path()).unwrap_err();
        match err {
            RagError::SourceError { path, .. } => assert!(path.ends_with(BUS_DATA_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_file_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(BUS_DATA_FILE), r#"{"districts": "nope"}"#).unwrap();
        fs::write(dir.path().join(PRIVACY_POLICY_FILE), "{}").unwrap();
        assert!(matches!(prepare_chunks(dir.path()), Err(RagError::SourceError { .. })));
    }
}
