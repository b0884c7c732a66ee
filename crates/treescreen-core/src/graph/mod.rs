//! Tree structures and the read-only directories every phase consults.

pub mod contamination;
pub mod gene_tree;
pub mod leaf;
pub mod newick;
pub mod taxonomy;
