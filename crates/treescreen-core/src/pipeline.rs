//! Batch orchestrator: timed phases over all gene trees with a worker pool.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::config::{ScreenConfig, ScreenResult, TableRow, TreeClades, TreeClassification};
use crate::error::{Result, ScreenError};
use crate::graph::contamination::ContaminationDirectory;
use crate::graph::gene_tree::GeneTree;
use crate::graph::taxonomy::TaxonDirectory;
use crate::output::{build_result, read_table, write_table, RunOutputs};
use crate::phases;
use crate::phases::discovery::{tree_base, tree_identity};
use crate::phases::problematic::ProblematicTable;

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("metadata", "Loading taxon metadata"),
    ("discovery", "Discovering gene trees"),
    ("suspicious", "Detecting suspicious clades"),
    ("problematic", "Aggregating problematic organisms"),
    ("classification", "Classifying leaves"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

struct PhaseClock {
    progress: Option<ProgressCallback>,
    timings: HashMap<String, f64>,
    current: Option<(&'static str, Instant)>,
}

impl PhaseClock {
    fn new(progress: Option<ProgressCallback>) -> Self {
        Self {
            progress,
            timings: HashMap::new(),
            current: None,
        }
    }

    fn start(&mut self, name: &'static str) {
        self.stop();
        let label = PHASE_LABELS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, l)| *l)
            .unwrap_or(name);
        log::info!("{label}");
        if let Some(ref mut cb) = self.progress {
            cb(name, label);
        }
        self.current = Some((name, Instant::now()));
    }

    fn stop(&mut self) {
        if let Some((name, start)) = self.current.take() {
            self.timings
                .insert(name.to_string(), start.elapsed().as_secs_f64());
        }
    }
}

/// Worker pool with `workers` threads (at least one).
pub fn build_pool(workers: usize) -> Result<ThreadPool> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()?)
}

/// Suspicious clades for every tree, ordered by tree identity.
///
/// Trees are independent; the sort makes the merge order deterministic.
pub fn detect_suspicious(
    pool: &ThreadPool,
    trees: &[PathBuf],
    taxa: &TaxonDirectory,
) -> Result<Vec<TreeClades>> {
    let mut results = pool.install(|| {
        trees
            .par_iter()
            .map(|path| phases::suspicious::detect_tree(path, taxa))
            .collect::<Result<Vec<_>>>()
    })?;
    results.sort_by(|a, b| a.tree.cmp(&b.tree));
    Ok(results)
}

/// Path of the classification table for a tree file.
pub fn table_path(config: &ScreenConfig, tree: &Path) -> PathBuf {
    let base = tree_base(tree, config.prefix.as_deref(), config.suffix.as_deref());
    Path::new(&config.output_folder).join(format!("{base}.tsv"))
}

/// Classify one tree and write (or backpropagate into) its table.
pub fn classify_tree_file(
    config: &ScreenConfig,
    path: &Path,
    taxa: &TaxonDirectory,
    contamination: Option<&ContaminationDirectory>,
) -> Result<TreeClassification> {
    let tree = GeneTree::load_rooted(path)?;
    let best = phases::candidates::best_candidates(&tree);
    let contaminants = match contamination {
        Some(dir) => phases::neighborhood::collect_contaminants(&tree, dir, taxa)?,
        None => BTreeSet::new(),
    };
    let records = phases::classification::classify_tree(&tree, taxa, &best, &contaminants)?;
    let table = table_path(config, path);

    if config.backpropagate {
        let names = phases::classification::contaminant_names(&contaminants, taxa)?;
        let mut rows = read_table(&table)?;
        if !names.is_empty() && !rows.iter().any(|r| names.contains(&r.name)) {
            log::warn!(
                "{}: {} contaminants but no matching rows",
                table.display(),
                names.len()
            );
        }
        let changed = phases::classification::backpropagate(&mut rows, &names);
        log::debug!("{}: {changed} rows marked as contaminants", table.display());
        write_table(&rows, &table)?;
    } else {
        let rows: Vec<TableRow> = records.iter().map(TableRow::from).collect();
        write_table(&rows, &table)?;
    }

    Ok(TreeClassification {
        tree: tree_identity(path),
        best_candidates: best,
        contaminants,
        records,
    })
}

/// Classification stage over every tree, ordered by tree identity.
pub fn classify_trees(
    pool: &ThreadPool,
    config: &ScreenConfig,
    trees: &[PathBuf],
    taxa: &TaxonDirectory,
    contamination: Option<&ContaminationDirectory>,
) -> Result<Vec<TreeClassification>> {
    let mut results = pool.install(|| {
        trees
            .par_iter()
            .map(|path| classify_tree_file(config, path, taxa, contamination))
            .collect::<Result<Vec<_>>>()
    })?;
    results.sort_by(|a, b| a.tree.cmp(&b.tree));
    Ok(results)
}

fn validate(config: &ScreenConfig) -> Result<()> {
    if config.metadata.is_empty() {
        return Err(ScreenError::Config("a metadata file is required".to_string()));
    }
    if config.backpropagate && config.contaminations.is_none() {
        return Err(ScreenError::Config(
            "backpropagation requires a contamination file".to_string(),
        ));
    }
    Ok(())
}

/// Load the directories named in `config` and run the whole screen.
pub fn run_pipeline(
    config: &ScreenConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<ScreenResult> {
    validate(config)?;
    let total_start = Instant::now();
    let mut clock = PhaseClock::new(progress_callback);

    clock.start("metadata");
    let taxa = TaxonDirectory::from_files(
        Path::new(&config.metadata),
        config.input_metadata.as_deref().map(Path::new),
    )?;
    let contamination = config
        .contaminations
        .as_deref()
        .map(|p| ContaminationDirectory::from_file(Path::new(p)))
        .transpose()?;

    run_with_directories(config, &taxa, contamination.as_ref(), clock, total_start)
}

/// Run the screen with already-loaded directories.
pub fn run_screen(
    config: &ScreenConfig,
    taxa: &TaxonDirectory,
    contamination: Option<&ContaminationDirectory>,
    progress_callback: Option<ProgressCallback>,
) -> Result<ScreenResult> {
    if config.backpropagate && contamination.is_none() {
        return Err(ScreenError::Config(
            "backpropagation requires a contamination file".to_string(),
        ));
    }
    run_with_directories(
        config,
        taxa,
        contamination,
        PhaseClock::new(progress_callback),
        Instant::now(),
    )
}

fn run_with_directories(
    config: &ScreenConfig,
    taxa: &TaxonDirectory,
    contamination: Option<&ContaminationDirectory>,
    mut clock: PhaseClock,
    total_start: Instant,
) -> Result<ScreenResult> {
    let pool = build_pool(config.worker_count())?;

    clock.start("discovery");
    let trees = phases::discovery::discover_trees(config)?;

    let output = Path::new(&config.output_folder);
    if !config.backpropagate {
        std::fs::create_dir_all(output).map_err(|e| ScreenError::io(output, e))?;
    }

    let mut suspicious = Vec::new();
    let mut nonredundant = Vec::new();
    let mut problematic = ProblematicTable::new();
    if !config.backpropagate {
        clock.start("suspicious");
        suspicious = detect_suspicious(&pool, &trees, taxa)?;

        clock.start("problematic");
        nonredundant = phases::problematic::nonredundant(&suspicious);
        problematic = phases::problematic::aggregate(&nonredundant, taxa)?;
    }

    clock.start("classification");
    let classifications = classify_trees(&pool, config, &trees, taxa, contamination)?;
    clock.stop();

    let contaminants: usize = classifications.iter().map(|c| c.contaminants.len()).sum();
    log::info!(
        "Screened {} trees: {} suspicious clades, {} contaminants",
        trees.len(),
        suspicious.iter().map(|r| r.clades.len()).sum::<usize>(),
        contaminants
    );

    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    let outputs = RunOutputs {
        tree_count: trees.len(),
        suspicious,
        nonredundant,
        problematic,
        group_colors: taxa.group_colors().clone(),
        classifications,
    };
    Ok(build_result(config, outputs, &clock.timings, total_ms))
}
