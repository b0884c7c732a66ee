//! Contamination directory: organism → expected taxonomic signal.

use std::collections::HashMap;
use std::path::Path;

use crate::config::RankLevel;
use crate::error::{Result, ScreenError};

/// What a correctly placed sequence of this organism should sit next to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedSignal {
    pub keyword: String,
    pub level: RankLevel,
}

#[derive(Debug, Clone, Default)]
pub struct ContaminationDirectory {
    entries: HashMap<String, ExpectedSignal>,
}

impl ContaminationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, organism: &str, keyword: &str, level: RankLevel) {
        self.entries.insert(
            organism.to_string(),
            ExpectedSignal {
                keyword: keyword.to_string(),
                level,
            },
        );
    }

    pub fn get(&self, organism: &str) -> Option<&ExpectedSignal> {
        self.entries.get(organism)
    }

    pub fn contains(&self, organism: &str) -> bool {
        self.entries.contains_key(organism)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ScreenError::io(path, e))?;
        let dir = Self::parse(&text, &path.display().to_string())?;
        log::info!("Loaded {} contamination entries", dir.len());
        Ok(dir)
    }

    /// Rows are `organism<TAB>keyword<TAB>rank_level`.
    pub fn parse(text: &str, source: &str) -> Result<Self> {
        let mut dir = Self::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').collect();
            let [organism, keyword, level] = cols.as_slice() else {
                return Err(ScreenError::MalformedRow {
                    file: source.to_string(),
                    line: i + 1,
                    message: format!("expected 3 columns, found {}", cols.len()),
                });
            };
            let level: RankLevel = level.trim().parse()?;
            dir.insert(organism.trim(), keyword.trim(), level);
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows() {
        let dir = ContaminationDirectory::parse("Xorg\tAlpha\tgroup\nYorg\tFungi\tsubtax\n\n", "c.tsv")
            .unwrap();
        assert_eq!(dir.len(), 2);
        assert_eq!(
            dir.get("Xorg"),
            Some(&ExpectedSignal {
                keyword: "Alpha".to_string(),
                level: RankLevel::Group,
            })
        );
        assert!(dir.contains("Yorg"));
    }

    #[test]
    fn wrong_column_count_is_fatal() {
        let err = ContaminationDirectory::parse("Xorg\tAlpha\n", "c.tsv").unwrap_err();
        assert!(matches!(err, ScreenError::MalformedRow { .. }));
    }

    #[test]
    fn unknown_rank_level_is_fatal() {
        let err = ContaminationDirectory::parse("Xorg\tAlpha\tfamily\n", "c.tsv").unwrap_err();
        assert!(matches!(err, ScreenError::UnknownRankLevel(ref s) if s == "family"));
    }
}
