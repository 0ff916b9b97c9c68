use std::path::PathBuf;

use miette::Diagnostic;
use pareval_metrics::ReportError;
use pareval_rt::{ConfigError, DatasetError, RuntimeError};
use thiserror::Error;

/// CLI-specific error type that provides rich diagnostics
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Invalid configuration")]
    #[diagnostic(
        code(pareval::cli::config_error),
        help("check the mode, the thread count and the thresholds in the sweep file")
    )]
    Config {
        #[source]
        source: ConfigError,
    },

    #[error("Could not load dataset")]
    #[diagnostic(
        code(pareval::cli::dataset_error),
        help("the dataset must be a CSV file of `label,text` rows without a header")
    )]
    Dataset {
        #[source]
        source: DatasetError,
    },

    #[error("Sweep failed")]
    #[diagnostic(code(pareval::cli::runtime_error))]
    Runtime {
        #[source]
        source: RuntimeError,
    },

    #[error("Could not write results")]
    #[diagnostic(code(pareval::cli::report_error))]
    Report {
        #[source]
        source: ReportError,
    },

    #[error("Failed to write {path}")]
    #[diagnostic(code(pareval::cli::io_error))]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("--plot was given but no plot script is configured")]
    #[diagnostic(
        code(pareval::cli::no_plot_script),
        help("pass --plot-script <FILE> or set `plot_script` in the sweep file")
    )]
    NoPlotScript,

    #[error("--runs must be at least 1")]
    #[diagnostic(code(pareval::cli::invalid_runs))]
    InvalidRuns,
}

impl From<ConfigError> for CliError {
    fn from(source: ConfigError) -> Self {
        CliError::Config { source }
    }
}

impl From<DatasetError> for CliError {
    fn from(source: DatasetError) -> Self {
        CliError::Dataset { source }
    }
}

impl From<ReportError> for CliError {
    fn from(source: ReportError) -> Self {
        CliError::Report { source }
    }
}

/// Unwraps config and dataset failures so they keep their own diagnostics.
impl From<RuntimeError> for CliError {
    fn from(error: RuntimeError) -> Self {
        match error {
            RuntimeError::Config(source) => CliError::Config { source },
            RuntimeError::Dataset(source) => CliError::Dataset { source },
            source => CliError::Runtime { source },
        }
    }
}

/// Convert IO errors with context
pub fn convert_io_error(error: std::io::Error, path: PathBuf) -> CliError {
    CliError::IoError {
        path,
        source: error,
    }
}
