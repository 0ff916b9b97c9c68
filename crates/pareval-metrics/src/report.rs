// pareval-metrics/src/report.rs

//! Reporting sink: the precision/recall table file, the optimal summary and
//! the optional plotting step.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::metrics::OptimalMetrics;
use crate::table::ThresholdTable;

/// Errors raised while persisting a sweep.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create output directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write results to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes one `Threshold: .., Precision: .., Recall: ..` line per threshold.
pub fn write_pr_table<W: Write>(mut out: W, table: &ThresholdTable) -> io::Result<()> {
    for (threshold, metrics) in table {
        writeln!(
            out,
            "Threshold: {:.6}, Precision: {:.6}, Recall: {:.6}",
            threshold, metrics.precision, metrics.recall
        )?;
    }
    out.flush()
}

/// Human-readable summary of the best thresholds.
pub fn format_optimal(optimal: &OptimalMetrics) -> String {
    format!(
        "Max Precision = {} at threshold {}\nMax Recall = {} at threshold {}",
        optimal.max_precision,
        optimal.precision_threshold,
        optimal.max_recall,
        optimal.recall_threshold
    )
}

/// Persists sweep results and optionally hands them to a plotting script.
#[derive(Debug, Clone)]
pub struct ReportSink {
    output: PathBuf,
    plot_script: Option<PathBuf>,
    python: String,
}

impl ReportSink {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        ReportSink {
            output: output.into(),
            plot_script: None,
            python: "python".to_string(),
        }
    }

    /// Runs `python <script> <table-file>` after the table is written.
    pub fn with_plot_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.plot_script = Some(script.into());
        self
    }

    /// Overrides the interpreter used for the plot script.
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Writes the table file and launches the plot script, if any.
    ///
    /// A plot script that cannot be launched or exits unsuccessfully is logged
    /// and otherwise ignored; the table file is the sink's real product.
    pub fn publish(
        &self,
        table: &ThresholdTable,
        optimal: &OptimalMetrics,
    ) -> Result<&Path, ReportError> {
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ReportError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = fs::File::create(&self.output).map_err(|source| ReportError::Write {
            path: self.output.clone(),
            source,
        })?;
        write_pr_table(BufWriter::new(file), table).map_err(|source| ReportError::Write {
            path: self.output.clone(),
            source,
        })?;
        log::info!("Wrote {} thresholds to {}", table.len(), self.output.display());
        log::debug!("{}", format_optimal(optimal));

        if let Some(script) = &self.plot_script {
            self.plot(script);
        }
        Ok(&self.output)
    }

    fn plot(&self, script: &Path) {
        log::debug!("Launching plot script {}", script.display());
        match Command::new(&self.python).arg(script).arg(&self.output).status() {
            Ok(status) if status.success() => {
                log::info!("Plot script {} finished", script.display());
            }
            Ok(status) => {
                log::warn!("Plot script {} exited with {}", script.display(), status);
            }
            Err(e) => {
                log::warn!("Could not launch plot script {}: {}", script.display(), e);
            }
        }
    }
}
