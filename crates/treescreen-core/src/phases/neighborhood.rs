//! Neighborhood consensus: does a candidate sit where its organism is expected?
//!
//! The test climbs from a leaf's parent towards the root until it finds
//! context (non-candidate leaves). One distinct keyword decides by substring
//! match; several distinct keywords fail the test; no context up to and
//! including the root also fails it.

use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;

use crate::config::RankLevel;
use crate::error::Result;
use crate::graph::contamination::{ContaminationDirectory, ExpectedSignal};
use crate::graph::gene_tree::GeneTree;
use crate::graph::leaf::LeafId;
use crate::graph::taxonomy::TaxonDirectory;

/// Keywords of the non-candidate leaves under `ancestor`.
fn neighborhood_keywords(
    tree: &GeneTree,
    ancestor: NodeIndex,
    level: RankLevel,
    taxa: &TaxonDirectory,
) -> Result<BTreeSet<String>> {
    let mut keywords = BTreeSet::new();
    for leaf in tree.leaves(ancestor) {
        let id = LeafId::parse(tree.name(leaf));
        if id.is_candidate() {
            continue;
        }
        keywords.insert(taxa.keyword(id.organism(), level)?);
    }
    Ok(keywords)
}

/// Consensus test starting at `ancestor`, walking up through parents.
pub fn expected_neighborhood(
    tree: &GeneTree,
    ancestor: Option<NodeIndex>,
    signal: &ExpectedSignal,
    taxa: &TaxonDirectory,
) -> Result<bool> {
    let mut current = ancestor;
    while let Some(node) = current {
        let keywords = neighborhood_keywords(tree, node, signal.level, taxa)?;
        match keywords.len() {
            0 => current = tree.parent(node),
            1 => {
                return Ok(keywords
                    .first()
                    .is_some_and(|k| k.contains(signal.keyword.as_str())))
            }
            _ => return Ok(false),
        }
    }
    Ok(false)
}

/// Whether `leaf` sits in the neighborhood expected for its organism.
pub fn check_placement(
    tree: &GeneTree,
    leaf: NodeIndex,
    signal: &ExpectedSignal,
    taxa: &TaxonDirectory,
) -> Result<bool> {
    expected_neighborhood(tree, tree.parent(leaf), signal, taxa)
}

/// Ranked-candidate leaves whose organism is listed and whose placement fails the test.
pub fn collect_contaminants(
    tree: &GeneTree,
    contamination: &ContaminationDirectory,
    taxa: &TaxonDirectory,
) -> Result<BTreeSet<String>> {
    let mut contaminants = BTreeSet::new();
    for node in tree.preorder() {
        if !tree.is_leaf(node) {
            continue;
        }
        let id = LeafId::parse(tree.name(node));
        if !id.is_candidate() {
            continue;
        }
        let Some(signal) = contamination.get(id.organism()) else {
            continue;
        };
        if !check_placement(tree, node, signal, taxa)? {
            log::debug!(
                "{} misplaced: expected {} at {} level",
                tree.name(node),
                signal.keyword,
                signal.level
            );
            contaminants.insert(tree.name(node).to_string());
        }
    }
    Ok(contaminants)
}
