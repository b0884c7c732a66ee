//! Suspicious clade detection: well-supported, minority-side, taxonomically mixed clades.

use std::collections::BTreeSet;
use std::path::Path;

use petgraph::graph::NodeIndex;

use crate::config::TreeClades;
use crate::error::Result;
use crate::graph::gene_tree::GeneTree;
use crate::graph::leaf::LeafId;
use crate::graph::taxonomy::TaxonDirectory;
use crate::phases::discovery::tree_identity;

/// Minimum support for a clade to count as well supported.
pub const SUPPORT_THRESHOLD: f64 = 70.0;

/// Distinct groups represented by a set of leaf labels.
pub fn clade_groups<'a, I>(labels: I, taxa: &TaxonDirectory) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut groups = BTreeSet::new();
    for label in labels {
        let leaf = LeafId::parse(label);
        groups.insert(taxa.group_of_leaf(&leaf)?.to_string());
    }
    Ok(groups)
}

/// Whether the clade under `node` passes the support, size and minority filters.
///
/// The complement is the rest of the whole tree, not the sibling subtree.
fn is_candidate_clade(tree: &GeneTree, node: NodeIndex) -> bool {
    if tree.is_root(node) || tree.is_leaf(node) {
        return false;
    }
    let size = tree.leaf_count(node);
    tree.support(node) >= SUPPORT_THRESHOLD && size < tree.len() - size && size > 1
}

/// Suspicious clades of a rooted tree, in pre-order of their supporting nodes.
pub fn suspicious_clades(tree: &GeneTree, taxa: &TaxonDirectory) -> Result<Vec<Vec<String>>> {
    let mut suspicious = Vec::new();
    for node in tree.preorder() {
        if !is_candidate_clade(tree, node) {
            continue;
        }
        let clade = tree.leaf_names(node);
        if clade_groups(&clade, taxa)?.len() > 1 {
            suspicious.push(clade);
        }
    }
    Ok(suspicious)
}

/// Load, root and scan one tree file.
pub fn detect_tree(path: &Path, taxa: &TaxonDirectory) -> Result<TreeClades> {
    let tree = GeneTree::load_rooted(path)?;
    let clades = suspicious_clades(&tree, taxa)?;
    log::debug!(
        "{}: {} leaves, {} suspicious clades",
        path.display(),
        tree.len(),
        clades.len()
    );
    Ok(TreeClades {
        tree: tree_identity(path),
        clades,
    })
}
