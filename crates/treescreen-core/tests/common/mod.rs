//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use treescreen_core::config::{ScreenConfig, Status, TableRow};
use treescreen_core::graph::contamination::ContaminationDirectory;
use treescreen_core::graph::taxonomy::TaxonDirectory;
use treescreen_core::output::read_table;

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

fn fixture_file(fixture_name: &str, file: &str) -> String {
    fixture_path(fixture_name)
        .join(file)
        .to_string_lossy()
        .to_string()
}

// ---------------------------------------------------------------------------
// Configs and directories
// ---------------------------------------------------------------------------

/// Screen config over a fixture, writing into `output`.
pub fn screen_config(fixture_name: &str, output: &Path) -> ScreenConfig {
    ScreenConfig {
        trees_folder: fixture_file(fixture_name, "trees"),
        output_folder: output.to_string_lossy().to_string(),
        metadata: fixture_file(fixture_name, "metadata.tsv"),
        input_metadata: Some(fixture_file(fixture_name, "input_metadata.tsv")),
        suffix: Some(".tre".to_string()),
        ..Default::default()
    }
}

/// Same config with the contamination file attached.
pub fn contamination_config(fixture_name: &str, output: &Path) -> ScreenConfig {
    ScreenConfig {
        contaminations: Some(fixture_file(fixture_name, "contaminations.tsv")),
        ..screen_config(fixture_name, output)
    }
}

pub fn load_taxa(fixture_name: &str) -> TaxonDirectory {
    let path = fixture_path(fixture_name);
    TaxonDirectory::from_files(
        &path.join("metadata.tsv"),
        Some(&path.join("input_metadata.tsv")),
    )
    .expect("Failed to load fixture metadata")
}

pub fn load_contamination(fixture_name: &str) -> ContaminationDirectory {
    ContaminationDirectory::from_file(&fixture_path(fixture_name).join("contaminations.tsv"))
        .expect("Failed to load fixture contaminations")
}

// ---------------------------------------------------------------------------
// Table extractors
// ---------------------------------------------------------------------------

/// Read `<output>/<base>.tsv`.
pub fn table(output: &Path, base: &str) -> Vec<TableRow> {
    read_table(&output.join(format!("{base}.tsv"))).expect("Failed to read table")
}

/// (name, status code) pairs of a table, in file order.
pub fn statuses(rows: &[TableRow]) -> Vec<(String, &'static str)> {
    rows.iter()
        .map(|r| (r.name.clone(), r.status.code()))
        .collect()
}

pub fn status_of(rows: &[TableRow], name: &str) -> Option<Status> {
    rows.iter().find(|r| r.name == name).map(|r| r.status)
}
