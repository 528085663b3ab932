use crate::tally::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use std::collections::BTreeMap;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ManifestScoring {
    pub algorithm: String,
    #[serde(rename = "copelandPoints")]
    pub copeland_points: Option<Vec<f64>>,
    pub tiebreaker: Option<String>,
    #[serde(rename = "unrankedFrom")]
    pub unranked_from: Option<String>,
    #[serde(rename = "groupBy")]
    pub group_by: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub choice: String,
    pub label: Option<String>,
    pub group: Option<String>,
    #[serde(rename = "isExtended")]
    pub is_extended: Option<bool>,
    #[serde(rename = "isEligibleFor2YearFunding")]
    pub is_eligible_for_2_year_funding: Option<bool>,
    pub budget: Option<u64>,
    // Any other metadata, some of which may be used for grouping.
    #[serde(flatten)]
    pub extra: BTreeMap<String, JSValue>,
}

impl ManifestEntry {
    pub fn to_choice(&self) -> Choice {
        let attributes: BTreeMap<String, String> = self
            .extra
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();
        Choice {
            label: self.choice.clone(),
            title: self.label.clone(),
            group: self.group.clone(),
            is_extended: self.is_extended,
            is_eligible_for_long_stream: self.is_eligible_for_2_year_funding,
            budget: self.budget,
            attributes,
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub scoring: ManifestScoring,
    pub entries: Vec<ManifestEntry>,
}

/// One vote, as exported by the governance platform. Choices are numbered from 1.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RawVote {
    pub voter: String,
    pub choice: Vec<u32>,
    pub vp: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteDump {
    /// The choice ids, in the order used to number them in the votes.
    pub choices: Vec<String>,
    pub votes: Vec<RawVote>,
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &str) -> AppResult<T> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

pub fn read_manifest(path: &str) -> AppResult<Manifest> {
    let manifest: Manifest = read_json_file(path)?;
    debug!("read manifest: {:?}", manifest);
    Ok(manifest)
}

pub fn read_votes(path: &str) -> AppResult<VoteDump> {
    let dump: VoteDump = read_json_file(path)?;
    debug!("read {} votes from {}", dump.votes.len(), path);
    Ok(dump)
}

pub fn read_summary(path: &str) -> AppResult<JSValue> {
    let js: JSValue = read_json_file(path)?;
    debug!("read content: {:?}", js["results"].as_array());
    Ok(js)
}
