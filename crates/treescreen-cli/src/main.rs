//! Treescreen CLI: screen gene trees for contamination and paralogy.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use treescreen_core::config::{ScreenConfig, ScreenResult};
use treescreen_core::output::{result_file, write_reports};
use treescreen_core::pipeline;

#[derive(Parser)]
#[command(
    name = "treescreen",
    about = "Treescreen - Flag contaminants and paralogs across a collection of gene trees"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a folder of gene trees and write per-tree classification tables
    Screen {
        /// Folder containing the gene-tree files
        #[arg(short = 't', long)]
        trees_folder: PathBuf,

        /// Folder for tables and reports
        #[arg(short, long)]
        output_folder: PathBuf,

        /// Taxon metadata (tab-separated)
        #[arg(short, long)]
        metadata: PathBuf,

        /// Additional metadata for newly added organisms
        #[arg(short = 'n', long)]
        input_metadata: Option<PathBuf>,

        /// Expected placement per organism: organism, keyword, group|subtax|org
        #[arg(short, long)]
        contaminations: Option<PathBuf>,

        /// Mark contaminants in previously written tables instead of writing new ones
        #[arg(short, long)]
        backpropagate: bool,

        /// Only use trees whose file name starts with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Only use trees whose file name ends with this suffix
        #[arg(long)]
        suffix: Option<String>,

        /// Worker threads for per-tree stages
        #[arg(long, default_value = "1")]
        threads: usize,

        /// Show per-phase timing breakdown
        #[arg(long)]
        verbose: bool,

        /// Suppress all output except errors
        #[arg(long)]
        quiet: bool,
    },
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Screen {
            trees_folder,
            output_folder,
            metadata,
            input_metadata,
            contaminations,
            backpropagate,
            prefix,
            suffix,
            threads,
            verbose,
            quiet,
        } => {
            init_logging(verbose);

            let config = ScreenConfig {
                trees_folder: path_string(&trees_folder),
                output_folder: path_string(&output_folder),
                metadata: path_string(&metadata),
                input_metadata: input_metadata.as_deref().map(path_string),
                contaminations: contaminations.as_deref().map(path_string),
                backpropagate,
                prefix,
                suffix,
                threads,
                verbose,
                quiet,
            };
            log::debug!(
                "Screening {} into {} with {} worker(s)",
                config.trees_folder,
                config.output_folder,
                config.worker_count()
            );

            if quiet {
                run_quiet(&config);
            } else {
                run_with_progress(&config, verbose);
            }
        }
    }
}

fn finish(result: &ScreenResult, config: &ScreenConfig) {
    if let Err(e) = write_reports(result, config) {
        eprintln!("Error writing output: {e}");
        std::process::exit(1);
    }
}

fn run_quiet(config: &ScreenConfig) {
    match pipeline::run_pipeline(config, None) {
        Ok(result) => finish(&result, config),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn stat(result: &ScreenResult, key: &str) -> serde_json::Value {
    result
        .stats
        .get(key)
        .cloned()
        .unwrap_or_else(|| serde_json::json!(0))
}

fn run_with_progress(config: &ScreenConfig, verbose: bool) {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message("Initialising...");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let start = Instant::now();
    let result = match pipeline::run_pipeline(config, Some(progress)) {
        Ok(r) => r,
        Err(e) => {
            pb.finish_and_clear();
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    pb.finish_and_clear();

    let mode = if config.backpropagate {
        "backpropagation"
    } else {
        "screen"
    };
    println!(
        "\n{}  Treescreen {}: {}",
        style("✓").green().bold(),
        mode,
        style(&config.trees_folder).bold()
    );
    println!("  {:<22} {}", "Trees:", stat(&result, "trees"));
    if !config.backpropagate {
        println!(
            "  {:<22} {}",
            "Suspicious clades:",
            stat(&result, "suspicious_clades")
        );
        println!(
            "  {:<22} {}",
            "Nonredundant clades:",
            stat(&result, "nonredundant_clades")
        );
        println!(
            "  {:<22} {}",
            "Problematic organisms:",
            stat(&result, "problematic_organisms")
        );
    }
    println!("  {:<22} {}", "Contaminants:", stat(&result, "contaminants"));
    println!(
        "  {:<22} {:.1}ms",
        "Duration:",
        start.elapsed().as_secs_f64() * 1000.0
    );

    if verbose {
        if let Some(serde_json::Value::Object(timings)) = result.metadata.get("phase_timings") {
            println!("\n  Phase Timings:");
            for (phase, secs) in timings {
                if let Some(val) = secs.as_f64() {
                    println!("    {:<16} {:.1}ms", phase, val * 1000.0);
                }
            }
        }
    }

    finish(&result, config);

    println!(
        "\n  {} {}",
        style("Output written to:").green(),
        Path::new(&config.output_folder)
            .join(result_file(config.backpropagate))
            .display()
    );
}
