//! Gene-tree file discovery in the trees folder.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::ScreenConfig;
use crate::error::{Result, ScreenError};

/// List tree files directly inside `trees_folder`, sorted by path.
///
/// A prefix filter takes precedence over a suffix filter.
pub fn discover_trees(config: &ScreenConfig) -> Result<Vec<PathBuf>> {
    let folder = Path::new(&config.trees_folder);
    let mut trees = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("walk error"));
            ScreenError::io(folder, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let keep = match (&config.prefix, &config.suffix) {
            (Some(prefix), _) => name.starts_with(prefix.as_str()),
            (None, Some(suffix)) => name.ends_with(suffix.as_str()),
            (None, None) => true,
        };
        if keep {
            trees.push(entry.into_path());
        }
    }

    trees.sort();
    if trees.is_empty() {
        log::warn!("No gene trees selected in {}", folder.display());
    } else {
        log::info!("Selected {} gene trees in {}", trees.len(), folder.display());
    }
    Ok(trees)
}

/// File name with every occurrence of the prefix and suffix removed.
pub fn tree_base(path: &Path, prefix: Option<&str>, suffix: Option<&str>) -> String {
    let mut base = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if let Some(p) = prefix.filter(|p| !p.is_empty()) {
        base = base.replace(p, "");
    }
    if let Some(s) = suffix.filter(|s| !s.is_empty()) {
        base = base.replace(s, "");
    }
    base
}

/// Identity used to order per-tree results.
pub fn tree_identity(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder_with(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), "(A_1,B_1);").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        dir
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn lists_files_sorted() {
        let dir = folder_with(&["b.tre", "a.tre", ".hidden"]);
        let config = ScreenConfig {
            trees_folder: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };
        assert_eq!(names(&discover_trees(&config).unwrap()), vec!["a.tre", "b.tre"]);
    }

    #[test]
    fn prefix_beats_suffix() {
        let dir = folder_with(&["RAxML_g1.tre", "g2.tre", "RAxML_g3.nwk"]);
        let config = ScreenConfig {
            trees_folder: dir.path().to_string_lossy().to_string(),
            prefix: Some("RAxML_".to_string()),
            suffix: Some(".tre".to_string()),
            ..Default::default()
        };
        assert_eq!(
            names(&discover_trees(&config).unwrap()),
            vec!["RAxML_g1.tre", "RAxML_g3.nwk"]
        );
    }

    #[test]
    fn suffix_filter() {
        let dir = folder_with(&["g1.tre", "g2.nwk"]);
        let config = ScreenConfig {
            trees_folder: dir.path().to_string_lossy().to_string(),
            suffix: Some(".tre".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&discover_trees(&config).unwrap()), vec!["g1.tre"]);
    }

    #[test]
    fn missing_folder_is_error() {
        let config = ScreenConfig {
            trees_folder: "/nonexistent/treescreen/trees".to_string(),
            ..Default::default()
        };
        assert!(discover_trees(&config).is_err());
    }

    #[test]
    fn base_strips_prefix_and_suffix() {
        let base = tree_base(
            Path::new("/data/RAxML_geneA_120.tre"),
            Some("RAxML_"),
            Some(".tre"),
        );
        assert_eq!(base, "geneA_120");
        assert_eq!(tree_base(Path::new("x/g.tre"), None, None), "g.tre");
    }
}
