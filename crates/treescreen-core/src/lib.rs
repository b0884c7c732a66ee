//! Treescreen Core: screening engine for gene-tree collections.
//!
//! This crate holds the analysis logic: Newick loading and midpoint rooting,
//! suspicious-clade detection, best-candidate selection, the neighborhood
//! consensus contamination test, problematic-organism aggregation and the
//! batch orchestrator that drives them over many trees.

pub mod config;
pub mod error;
pub mod graph;
pub mod output;
pub mod phases;
pub mod pipeline;

pub use error::{Result, ScreenError};
