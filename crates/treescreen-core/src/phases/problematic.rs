//! Redundant-clade collapsing and per-organism problematic-group statistics.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{NonredundantClade, ProblematicLabel, TreeClades};
use crate::error::Result;
use crate::graph::leaf::LeafId;
use crate::graph::taxonomy::TaxonDirectory;

// ---------------------------------------------------------------------------
// Redundancy reduction
// ---------------------------------------------------------------------------

/// Drop every clade that is a subset of a later clade in size order.
///
/// Sorting is stable, so among identical clades only the last copy survives.
pub fn nonredundant_sets(clades: &[BTreeSet<String>]) -> Vec<BTreeSet<String>> {
    let mut sorted: Vec<&BTreeSet<String>> = clades.iter().collect();
    sorted.sort_by_key(|c| c.len());

    sorted
        .iter()
        .enumerate()
        .filter(|(i, clade)| !sorted[i + 1..].iter().any(|other| clade.is_subset(other)))
        .map(|(_, clade)| (*clade).clone())
        .collect()
}

/// Maximal suspicious clades of every tree, keeping tree order.
pub fn nonredundant(results: &[TreeClades]) -> Vec<NonredundantClade> {
    let mut out = Vec::new();
    for result in results {
        if result.clades.is_empty() {
            continue;
        }
        let sets: Vec<BTreeSet<String>> = result
            .clades
            .iter()
            .map(|c| c.iter().cloned().collect())
            .collect();
        out.extend(
            nonredundant_sets(&sets)
                .into_iter()
                .map(|members| NonredundantClade {
                    tree: result.tree.clone(),
                    members,
                }),
        );
    }
    out
}

// ---------------------------------------------------------------------------
// Problematic-organism table
// ---------------------------------------------------------------------------

/// Organism → group labels collected from nonredundant clades.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblematicTable {
    entries: BTreeMap<String, Vec<ProblematicLabel>>,
}

impl ProblematicTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, organism: &str, label: ProblematicLabel) {
        self.entries
            .entry(organism.to_string())
            .or_default()
            .push(label);
    }

    /// Append every entry of `other` after this table's entries.
    pub fn merge(&mut self, other: ProblematicTable) {
        for (organism, labels) in other.entries {
            self.entries.entry(organism).or_default().extend(labels);
        }
    }

    pub fn get(&self, organism: &str) -> Option<&[ProblematicLabel]> {
        self.entries.get(organism).map(|v| v.as_slice())
    }

    /// Label counts for one organism, the series a bar chart is drawn from.
    pub fn counts(&self, organism: &str) -> BTreeMap<ProblematicLabel, usize> {
        let mut counts = BTreeMap::new();
        for label in self.get(organism).unwrap_or(&[]) {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn entries(&self) -> &BTreeMap<String, Vec<ProblematicLabel>> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, Vec<ProblematicLabel>> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Group holding the largest share of a clade. Equal shares go to the
/// alphabetically first group.
pub fn dominant_group(counts: &BTreeMap<String, usize>) -> Option<&str> {
    let mut best: Option<(&str, usize)> = None;
    for (group, &count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((group, count));
        }
    }
    best.map(|(g, _)| g)
}

/// Problematic entries contributed by a single clade.
pub fn clade_contribution(
    members: &BTreeSet<String>,
    taxa: &TaxonDirectory,
) -> Result<ProblematicTable> {
    let mut table = ProblematicTable::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut member_groups: Vec<(String, String)> = Vec::with_capacity(members.len());
    for label in members {
        let leaf = LeafId::parse(label);
        let group = taxa.group_of_leaf(&leaf)?.to_string();
        *counts.entry(group.clone()).or_insert(0) += 1;
        member_groups.push((leaf.organism().to_string(), group));
    }

    let Some(dominant) = dominant_group(&counts) else {
        return Ok(table);
    };
    let total = members.len();
    for (organism, group) in &member_groups {
        let label = if counts[group] * 2 == total {
            ProblematicLabel::Unspecified
        } else {
            ProblematicLabel::Group(dominant.to_string())
        };
        table.record(organism, label);
    }
    Ok(table)
}

/// Fold all nonredundant clades into one table.
pub fn aggregate(clades: &[NonredundantClade], taxa: &TaxonDirectory) -> Result<ProblematicTable> {
    let mut table = ProblematicTable::new();
    for clade in clades {
        table.merge(clade_contribution(&clade.members, taxa)?);
    }
    log::info!(
        "{} problematic organisms from {} nonredundant clades",
        table.len(),
        clades.len()
    );
    Ok(table)
}
