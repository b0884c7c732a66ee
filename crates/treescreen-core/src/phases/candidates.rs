//! Best-candidate selection among ranked duplicate sequences.

use std::collections::{BTreeSet, HashMap};

use crate::graph::gene_tree::GeneTree;
use crate::graph::leaf::LeafId;

/// Lowest-rank candidate leaf for every organism that has ranked candidates.
///
/// Ties keep the first leaf in pre-order. An unreadable rank sorts after every
/// readable one.
pub fn best_candidates(tree: &GeneTree) -> BTreeSet<String> {
    // organism -> (rank key, leaf label)
    let mut top_rank: HashMap<String, (u64, String)> = HashMap::new();

    for node in tree.preorder() {
        if !tree.is_leaf(node) {
            continue;
        }
        let label = tree.name(node);
        let LeafId::RankedCandidate { organism, rank, .. } = LeafId::parse(label) else {
            continue;
        };
        let key = rank.map(u64::from).unwrap_or(u64::MAX);
        let better = top_rank
            .get(&organism)
            .map_or(true, |(best, _)| key < *best);
        if better {
            top_rank.insert(organism, (key, label.to_string()));
        }
    }

    top_rank.into_values().map(|(_, label)| label).collect()
}
