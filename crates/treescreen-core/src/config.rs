//! Core data types and configuration for a screening run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::ScreenError;

/// Taxonomic level at which a contamination keyword is compared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RankLevel {
    Group,
    Subtax,
    Org,
}

impl RankLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Subtax => "subtax",
            Self::Org => "org",
        }
    }
}

impl std::str::FromStr for RankLevel {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(Self::Group),
            "subtax" => Ok(Self::Subtax),
            "org" => Ok(Self::Org),
            _ => Err(ScreenError::UnknownRankLevel(s.to_string())),
        }
    }
}

impl std::fmt::Display for RankLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one leaf in one tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Best candidate or plain organism sequence (`o`).
    Original,
    /// Paralog or non-best candidate (`p`).
    Paralog,
    /// Contaminant, to be discarded (`d`).
    Contaminant,
}

impl Status {
    /// Single-letter code used in classification tables.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Original => "o",
            Self::Paralog => "p",
            Self::Contaminant => "d",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "o" => Some(Self::Original),
            "p" => Some(Self::Paralog),
            "d" => Some(Self::Contaminant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Per-leaf classification produced for a tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationRecord {
    pub leaf_id: String,
    pub display_name: String,
    pub group: String,
    pub status: Status,
}

/// One line of a classification table file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRow {
    pub name: String,
    pub group: String,
    pub status: Status,
}

impl From<&ClassificationRecord> for TableRow {
    fn from(record: &ClassificationRecord) -> Self {
        Self {
            name: record.display_name.clone(),
            group: record.group.clone(),
            status: record.status,
        }
    }
}

/// Suspicious clades found in one tree, in pre-order of their supporting nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeClades {
    pub tree: String,
    pub clades: Vec<Vec<String>>,
}

/// A suspicious clade that is not nested in a larger one from the same tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NonredundantClade {
    pub tree: String,
    pub members: BTreeSet<String>,
}

/// Group label appended to an organism's problematic entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProblematicLabel {
    Group(String),
    /// Own group held exactly half of the clade.
    Unspecified,
}

pub const UNSPECIFIED: &str = "unspecified";

impl ProblematicLabel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Group(g) => g,
            Self::Unspecified => UNSPECIFIED,
        }
    }
}

impl std::fmt::Display for ProblematicLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProblematicLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProblematicLabel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(if s == UNSPECIFIED {
            Self::Unspecified
        } else {
            Self::Group(s)
        })
    }
}

/// Classification outcome for one tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeClassification {
    pub tree: String,
    #[serde(default)]
    pub best_candidates: BTreeSet<String>,
    #[serde(default)]
    pub contaminants: BTreeSet<String>,
    #[serde(default)]
    pub records: Vec<ClassificationRecord>,
}

/// Configuration for a screening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    #[serde(default)]
    pub trees_folder: String,
    #[serde(default)]
    pub output_folder: String,
    #[serde(default)]
    pub metadata: String,
    pub input_metadata: Option<String>,
    pub contaminations: Option<String>,
    /// Rewrite existing classification tables instead of producing new ones.
    #[serde(default)]
    pub backpropagate: bool,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_threads() -> usize {
    1
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            trees_folder: String::new(),
            output_folder: String::new(),
            metadata: String::new(),
            input_metadata: None,
            contaminations: None,
            backpropagate: false,
            prefix: None,
            suffix: None,
            threads: default_threads(),
            verbose: false,
            quiet: false,
        }
    }
}

impl ScreenConfig {
    /// Worker count clamped to `[1, available parallelism]`.
    pub fn worker_count(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.threads.clamp(1, available.max(1))
    }
}

/// Result of a screening run, serialised as the run summary JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenResult {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub stats: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub suspicious: Vec<TreeClades>,
    #[serde(default)]
    pub nonredundant: Vec<NonredundantClade>,
    #[serde(default)]
    pub problematic: BTreeMap<String, Vec<ProblematicLabel>>,
    #[serde(default)]
    pub group_colors: BTreeMap<String, String>,
    #[serde(default)]
    pub classifications: Vec<TreeClassification>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ScreenResult {
    fn default() -> Self {
        Self {
            version: default_version(),
            metadata: HashMap::new(),
            stats: HashMap::new(),
            suspicious: Vec::new(),
            nonredundant: Vec::new(),
            problematic: BTreeMap::new(),
            group_colors: BTreeMap::new(),
            classifications: Vec::new(),
        }
    }
}
