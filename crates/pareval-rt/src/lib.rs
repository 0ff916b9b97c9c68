//! Parallel threshold-sweep evaluation.
//!
//! A sweep scores every record of a [`Dataset`] against a series of
//! thresholds and reports precision and recall per threshold. The work of a
//! single threshold round is spread over worker threads according to a
//! [`Mode`]: sequentially, in static chunks joined through a barrier, or in
//! per-worker deques with or without work stealing. All modes produce the
//! same table for the same input.

mod config;
mod dataset;
mod error;
mod evaluator;
mod partition;
mod runner;
mod types;

pub use config::{Config, DatasetLayout, Mode, SweepConfig, DEFAULT_THRESHOLDS};
pub use dataset::{Dataset, Record};
pub use error::{ConfigError, DatasetError, RuntimeError};
pub use evaluator::{ConstantEvaluator, Evaluator, LexiconEvaluator, Score, ScoreFn};
pub use partition::{chunk_bounds, chunk_size};
pub use runner::{RoundStats, StrategyRunner, SweepReport, WorkerStats};
pub use types::{Task, WorkerId};

/// Loads the configured dataset and runs the full sweep over it.
///
/// The configuration is checked before the dataset is read, so a bad thread
/// count or threshold list fails without touching the file system.
pub fn evaluate(config: &Config, evaluator: &dyn Evaluator) -> Result<SweepReport, RuntimeError> {
    config.validate()?;
    let dataset = Dataset::load(&config.dataset, config.layout)?;
    StrategyRunner::new(config, evaluator).run(&dataset)
}
