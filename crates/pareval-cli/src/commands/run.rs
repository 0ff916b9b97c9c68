use std::path::PathBuf;
use std::time::Instant;

use pareval_metrics::{format_optimal, ReportSink};
use pareval_rt::{Config, DatasetLayout, LexiconEvaluator, Mode};

use super::load_sweep;
use crate::error::CliError;

/// Options of `pareval run`, after flag parsing.
#[derive(Debug)]
pub struct RunOptions {
    pub dataset: PathBuf,
    pub layout: DatasetLayout,
    pub mode: Mode,
    pub threads: Option<usize>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub plot: bool,
    pub plot_script: Option<PathBuf>,
}

/// Runs one sweep, writes the precision/recall table and prints the best
/// thresholds followed by the elapsed seconds.
pub fn handle_run(options: RunOptions) -> Result<(), CliError> {
    let started = Instant::now();

    let mut sweep = load_sweep(options.config.as_deref())?;
    if let Some(output) = options.output {
        sweep.output = output;
    }
    if let Some(script) = options.plot_script {
        sweep.plot_script = Some(script);
    }
    let plot_script = if options.plot {
        Some(sweep.plot_script.clone().ok_or(CliError::NoPlotScript)?)
    } else {
        None
    };

    let config = Config::new(options.mode, options.threads, options.dataset)
        .with_layout(options.layout)
        .with_sweep(sweep);
    log::info!(
        "Evaluating {} in mode {} with {} worker(s)",
        config.dataset.display(),
        config.mode,
        config.workers()
    );

    let report = pareval_rt::evaluate(&config, &LexiconEvaluator)?;

    let mut sink = ReportSink::new(&config.sweep.output);
    if let Some(script) = plot_script {
        sink = sink.with_plot_script(script);
    }
    sink.publish(&report.table, &report.optimal)?;

    println!("{}", format_optimal(&report.optimal));
    println!("{:.2}", started.elapsed().as_secs_f64());
    Ok(())
}
