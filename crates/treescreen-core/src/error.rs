//! Error taxonomy for a screening run.
//!
//! Every variant is fatal: the pipeline propagates it and aborts the run.

use crate::graph::newick::NewickError;

/// Errors raised while loading inputs or screening trees.
#[derive(thiserror::Error, Debug)]
pub enum ScreenError {
    /// File could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Tree file is not valid Newick
    #[error("Malformed tree {path}: {source}")]
    Newick {
        path: String,
        #[source]
        source: NewickError,
    },

    /// A metadata, contamination or classification-table row could not be decoded
    #[error("Malformed row in {file} line {line}: {message}")]
    MalformedRow {
        file: String,
        line: usize,
        message: String,
    },

    /// Rank level outside `group`, `subtax`, `org`
    #[error("{0} has to be group, subtax or org")]
    UnknownRankLevel(String),

    /// Leaf organism missing from the taxon directory
    #[error("Organism {0} not found in metadata")]
    UnknownOrganism(String),

    /// Run configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ScreenError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ScreenError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Result type for screening operations.
pub type Result<T> = std::result::Result<T, ScreenError>;
