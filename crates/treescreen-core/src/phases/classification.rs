//! Per-tree classification tables and contamination backpropagation.

use std::collections::BTreeSet;

use crate::config::{ClassificationRecord, Status, TableRow};
use crate::error::Result;
use crate::graph::gene_tree::GeneTree;
use crate::graph::leaf::LeafId;
use crate::graph::taxonomy::TaxonDirectory;

/// Human-readable label: `<full name>_<tag>@<code>`.
pub fn display_name(leaf: &LeafId, taxa: &TaxonDirectory) -> Result<String> {
    let record = taxa.record(leaf.organism())?;
    Ok(format!(
        "{}_{}@{}",
        record.full_name,
        leaf.tag(),
        leaf.display_code()
    ))
}

/// Classify every leaf of a rooted tree, in pre-order.
pub fn classify_tree(
    tree: &GeneTree,
    taxa: &TaxonDirectory,
    best_candidates: &BTreeSet<String>,
    contaminants: &BTreeSet<String>,
) -> Result<Vec<ClassificationRecord>> {
    let mut records = Vec::with_capacity(tree.len());
    for node in tree.leaves(tree.root()) {
        let label = tree.name(node);
        let leaf = LeafId::parse(label);
        let status = match &leaf {
            LeafId::RankedCandidate { .. } if contaminants.contains(label) => Status::Contaminant,
            LeafId::RankedCandidate { .. } if best_candidates.contains(label) => Status::Original,
            LeafId::RankedCandidate { .. } | LeafId::Paralog { .. } => Status::Paralog,
            LeafId::Simple { .. } => Status::Original,
        };
        records.push(ClassificationRecord {
            leaf_id: label.to_string(),
            display_name: display_name(&leaf, taxa)?,
            group: taxa.group_of_leaf(&leaf)?.to_string(),
            status,
        });
    }
    Ok(records)
}

/// Display names of the given contaminant leaves, as they appear in tables.
pub fn contaminant_names(
    contaminants: &BTreeSet<String>,
    taxa: &TaxonDirectory,
) -> Result<BTreeSet<String>> {
    contaminants
        .iter()
        .map(|label| display_name(&LeafId::parse(label), taxa))
        .collect()
}

/// Mark rows naming a contaminant as discarded; other statuses stay as they were.
///
/// Returns how many rows changed status.
pub fn backpropagate(rows: &mut [TableRow], contaminant_names: &BTreeSet<String>) -> usize {
    let mut changed = 0;
    for row in rows.iter_mut() {
        if contaminant_names.contains(&row.name) && row.status != Status::Contaminant {
            row.status = Status::Contaminant;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn taxa() -> TaxonDirectory {
        let mut dir = TaxonDirectory::new();
        dir.insert("A", "Org a", "Alpha", "Alpha-one", "red");
        dir.insert("C", "Org c", "Beta", "Beta-one", "blue");
        dir.insert("X", "Org x", "Alpha", "Alpha-one", "red");
        dir
    }

    #[test]
    fn display_names_by_variant() {
        let taxa = taxa();
        assert_eq!(
            display_name(&LeafId::parse("A_120"), &taxa).unwrap(),
            "Org a_120@A"
        );
        assert_eq!(
            display_name(&LeafId::parse("A..p2_88"), &taxa).unwrap(),
            "Org a_88@A..p2"
        );
        assert_eq!(
            display_name(&LeafId::parse("X_c1_len_{2}_q9"), &taxa).unwrap(),
            "Org x_len_{2}_q9@X"
        );
    }

    #[test]
    fn statuses_follow_variant_and_sets() {
        let tree = GeneTree::from_newick(
            "((X_c1_l_{1}_q,X_c2_l_{2}_q)90,(X_c3_l_{3}_q,A..p1_40)90,C_10);",
        )
        .unwrap();
        let best = BTreeSet::from(["X_c1_l_{1}_q".to_string()]);
        let contaminants = BTreeSet::from(["X_c3_l_{3}_q".to_string()]);
        let records = classify_tree(&tree, &taxa(), &best, &contaminants).unwrap();
        let statuses: Vec<(String, Status)> = records
            .iter()
            .map(|r| (r.leaf_id.clone(), r.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("X_c1_l_{1}_q".to_string(), Status::Original),
                ("X_c2_l_{2}_q".to_string(), Status::Paralog),
                ("X_c3_l_{3}_q".to_string(), Status::Contaminant),
                ("A..p1_40".to_string(), Status::Paralog),
                ("C_10".to_string(), Status::Original),
            ]
        );
        assert_eq!(records[4].group, "Beta");
    }

    #[test]
    fn contaminant_status_wins_over_best() {
        let tree = GeneTree::from_newick("(X_c1_l_{1}_q,A_1);").unwrap();
        let both = BTreeSet::from(["X_c1_l_{1}_q".to_string()]);
        let records = classify_tree(&tree, &taxa(), &both, &both).unwrap();
        assert_eq!(records[0].status, Status::Contaminant);
    }

    #[test]
    fn backpropagation_only_touches_named_rows() {
        let mut rows = vec![
            TableRow {
                name: "Org x_l_{1}_q@X".to_string(),
                group: "Alpha".to_string(),
                status: Status::Original,
            },
            TableRow {
                name: "Org x_l_{2}_q@X".to_string(),
                group: "Alpha".to_string(),
                status: Status::Paralog,
            },
            TableRow {
                name: "Org a_1@A".to_string(),
                group: "Alpha".to_string(),
                status: Status::Original,
            },
        ];
        let names = contaminant_names(&BTreeSet::from(["X_c1_l_{1}_q".to_string()]), &taxa())
            .unwrap();
        let changed = backpropagate(&mut rows, &names);
        assert_eq!(changed, 1);
        assert_eq!(rows[0].status, Status::Contaminant);
        assert_eq!(rows[1].status, Status::Paralog);
        assert_eq!(rows[2].status, Status::Original);
    }
}
