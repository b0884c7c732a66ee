//! Taxon directory: organism code → group, sub-taxon, display name and color.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::config::RankLevel;
use crate::error::{Result, ScreenError};
use crate::graph::leaf::LeafId;

/// Color used for secondary-source organisms and placeholder colors.
pub const DEFAULT_COLOR: &str = "white";

/// Color values meaning "no color chosen".
const PLACEHOLDER_COLORS: &[&str] = &["x", "xx"];

/// Metadata for one organism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonRecord {
    pub group: String,
    pub color: String,
    pub full_name: String,
    pub sub_taxon: String,
}

/// Read-only lookup built once from metadata files.
#[derive(Debug, Clone, Default)]
pub struct TaxonDirectory {
    taxa: HashMap<String, TaxonRecord>,
    group_colors: BTreeMap<String, String>,
}

impl TaxonDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an organism. The first color seen for a group applies to the whole group.
    pub fn insert(&mut self, code: &str, full_name: &str, group: &str, sub_taxon: &str, color: &str) {
        let color = if PLACEHOLDER_COLORS.contains(&color.to_lowercase().as_str()) {
            DEFAULT_COLOR
        } else {
            color
        };
        let color = self
            .group_colors
            .entry(group.to_string())
            .or_insert_with(|| color.to_string())
            .clone();
        self.taxa.insert(
            code.to_string(),
            TaxonRecord {
                group: group.to_string(),
                color,
                full_name: full_name.to_string(),
                sub_taxon: sub_taxon.to_string(),
            },
        );
    }

    /// Register an organism from the secondary source; it never sets a group color.
    pub fn insert_secondary(&mut self, code: &str, full_name: &str, group: &str, sub_taxon: &str) {
        self.taxa.insert(
            code.to_string(),
            TaxonRecord {
                group: group.to_string(),
                color: DEFAULT_COLOR.to_string(),
                full_name: full_name.to_string(),
                sub_taxon: sub_taxon.to_string(),
            },
        );
    }

    pub fn get(&self, code: &str) -> Option<&TaxonRecord> {
        self.taxa.get(code)
    }

    /// Record for `code`; a missing organism is fatal.
    pub fn record(&self, code: &str) -> Result<&TaxonRecord> {
        self.taxa
            .get(code)
            .ok_or_else(|| ScreenError::UnknownOrganism(code.to_string()))
    }

    pub fn group_of(&self, code: &str) -> Result<&str> {
        Ok(&self.record(code)?.group)
    }

    /// Group of the organism a leaf belongs to.
    pub fn group_of_leaf(&self, leaf: &LeafId) -> Result<&str> {
        self.group_of(leaf.organism())
    }

    /// Keyword describing `code` at the requested taxonomic level.
    pub fn keyword(&self, code: &str, level: RankLevel) -> Result<String> {
        Ok(match level {
            RankLevel::Group => self.record(code)?.group.clone(),
            RankLevel::Subtax => self.record(code)?.sub_taxon.clone(),
            RankLevel::Org => code.to_string(),
        })
    }

    pub fn group_colors(&self) -> &BTreeMap<String, String> {
        &self.group_colors
    }

    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    /// Load the primary metadata file and, optionally, the secondary one.
    pub fn from_files(primary: &Path, secondary: Option<&Path>) -> Result<Self> {
        let mut dir = Self::new();
        let text = std::fs::read_to_string(primary).map_err(|e| ScreenError::io(primary, e))?;
        dir.load_primary(&text, &primary.display().to_string())?;
        if let Some(path) = secondary {
            let text = std::fs::read_to_string(path).map_err(|e| ScreenError::io(path, e))?;
            dir.load_secondary(&text, &path.display().to_string())?;
        }
        log::info!("Loaded metadata for {} organisms", dir.len());
        Ok(dir)
    }

    /// Primary metadata rows: `code, full name, group, sub-taxon, color`.
    pub fn load_primary(&mut self, text: &str, source: &str) -> Result<()> {
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() || line.contains("Full Name") {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').map(str::trim).collect();
            if cols.len() < 5 {
                return Err(ScreenError::MalformedRow {
                    file: source.to_string(),
                    line: i + 1,
                    message: format!("expected 5 columns, found {}", cols.len()),
                });
            }
            self.insert(cols[0], cols[1], cols[2], cols[3], cols[4]);
        }
        Ok(())
    }

    /// Secondary metadata rows: column 2 is `<code>_...`, then group, sub-taxon and full name at 3, 4, 6.
    pub fn load_secondary(&mut self, text: &str, source: &str) -> Result<()> {
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() || line.contains("FILE_NAME") {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').map(str::trim).collect();
            if cols.len() < 7 {
                return Err(ScreenError::MalformedRow {
                    file: source.to_string(),
                    line: i + 1,
                    message: format!("expected 7 columns, found {}", cols.len()),
                });
            }
            let code = cols[2].split('_').next().unwrap_or_default();
            self.insert_secondary(code, cols[6], cols[3], cols[4]);
        }
        Ok(())
    }
}
