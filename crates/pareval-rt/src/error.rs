use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::Mode;
use crate::types::WorkerId;

/// Problems with the run configuration. Raised before any work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown execution mode '{0}'. Expected one of: s, p-normal, p-nosteal, p-steal")]
    UnknownMode(String),

    #[error("Unknown dataset layout '{0}'. Expected 'balanced' or 'imbalanced'")]
    UnknownLayout(String),

    #[error("Mode {0} needs at least one worker thread")]
    MissingThreads(Mode),

    #[error("The threshold sweep is empty")]
    EmptySweep,

    #[error("Threshold {0} is not a number in [0, 1]")]
    InvalidThreshold(f32),

    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Problems loading the dataset. Always fatal; no partial results are produced.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed CSV at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Row at line {line} has {found} column(s); expected a label and a text column")]
    MissingColumns { line: usize, found: usize },

    #[error("Dataset {0} contains no records")]
    Empty(PathBuf),
}

/// Errors surfaced by a sweep.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("Worker {worker} panicked while evaluating threshold {threshold}")]
    WorkerPanicked { worker: WorkerId, threshold: f32 },

    #[error("Deque for worker {0} already has an owner")]
    DequeOwned(WorkerId),
}
