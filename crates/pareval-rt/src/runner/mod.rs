// pareval-rt/src/runner/mod.rs

//! The strategy runner.
//!
//! A sweep is a strictly sequential series of rounds, one per threshold. Each
//! round distributes the dataset over workers according to the configured
//! [`Mode`], waits for every worker to finish, reduces their counters and
//! folds the result into the sweep's [`OptimalMetrics`]. Only the work inside
//! a round runs in parallel.

mod barrier;
mod deque;
mod sequential;
mod worker;

use std::thread;
use std::time::{Duration, Instant};

use pareval_metrics::{Counters, Metrics, OptimalMetrics, ThresholdTable};
use pareval_sync::Barrier;

use crate::config::{Config, Mode};
use crate::dataset::{Dataset, Record};
use crate::error::RuntimeError;
use crate::evaluator::Evaluator;

use deque::Stealing;
pub use worker::WorkerStats;

/// Per-round state shared read-only by all workers of that round.
#[derive(Clone, Copy)]
pub(crate) struct RoundContext<'a> {
    evaluator: &'a dyn Evaluator,
    positive_label: &'a str,
    threshold: f32,
}

impl RoundContext<'_> {
    /// Scores one record and folds it into `counters`.
    #[inline]
    pub(crate) fn observe(&self, counters: &mut Counters, record: &Record) {
        let score = self.evaluator.score(record);
        counters.observe(score.value, score.label == self.positive_label, self.threshold);
    }
}

/// What a finished round hands back to the coordinator.
#[derive(Debug)]
pub(crate) struct RoundOutcome {
    counters: Counters,
    workers: Vec<WorkerStats>,
}

/// Resolves the results of a round whose worker handles have all been joined.
/// The first panicked worker, in worker order, fails the round.
fn joined<T>(results: Vec<thread::Result<T>>, threshold: f32) -> Result<Vec<T>, RuntimeError> {
    let mut values = Vec::with_capacity(results.len());
    for (worker, result) in results.into_iter().enumerate() {
        match result {
            Ok(value) => values.push(value),
            Err(_) => {
                log::warn!("Worker {} panicked at threshold {}", worker, threshold);
                return Err(RuntimeError::WorkerPanicked { worker, threshold });
            }
        }
    }
    Ok(values)
}

/// Execution statistics of one threshold round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundStats {
    pub threshold: f32,
    /// One entry per worker, in worker order.
    pub workers: Vec<WorkerStats>,
    pub elapsed: Duration,
}

impl RoundStats {
    /// Records processed across all workers.
    pub fn processed(&self) -> usize {
        self.workers.iter().map(|w| w.processed).sum()
    }

    /// Records that were processed by a worker other than their chunk's owner.
    pub fn stolen(&self) -> usize {
        self.workers.iter().map(|w| w.stolen).sum()
    }
}

/// Result of a full sweep, handed to the reporting sink.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub mode: Mode,
    pub workers: usize,
    pub table: ThresholdTable,
    pub optimal: OptimalMetrics,
    pub rounds: Vec<RoundStats>,
    pub elapsed: Duration,
}

/// Drives a threshold sweep over a dataset under one [`Mode`].
pub struct StrategyRunner<'c> {
    config: &'c Config,
    evaluator: &'c dyn Evaluator,
}

impl<'c> StrategyRunner<'c> {
    pub fn new(config: &'c Config, evaluator: &'c dyn Evaluator) -> Self {
        StrategyRunner { config, evaluator }
    }

    /// Runs every threshold of the sweep in order.
    ///
    /// The configuration is validated before any worker starts. A round whose
    /// workers did not all complete produces no table entry; the sweep stops
    /// with an error instead.
    pub fn run(&self, dataset: &Dataset) -> Result<SweepReport, RuntimeError> {
        self.config.validate()?;

        let mode = self.config.mode;
        let workers = self.config.workers();
        let thresholds = &self.config.sweep.thresholds;
        log::info!(
            "Sweeping {} thresholds over {} records (mode {}, {} worker(s))",
            thresholds.len(),
            dataset.len(),
            mode,
            workers
        );

        let started = Instant::now();
        let mut table = ThresholdTable::with_capacity(thresholds.len());
        let mut optimal = OptimalMetrics::new();
        let mut rounds = Vec::with_capacity(thresholds.len());
        let mut barrier = Barrier::default();

        for &threshold in thresholds {
            let ctx = RoundContext {
                evaluator: self.evaluator,
                positive_label: &self.config.sweep.positive_label,
                threshold,
            };

            log::debug!("Round for threshold {} starting", threshold);
            let round_started = Instant::now();
            let outcome = match mode {
                Mode::Sequential => sequential::run_round(&ctx, dataset),
                Mode::BarrierParallel => barrier::run_round(&ctx, dataset, workers, &mut barrier)?,
                Mode::DequeNoSteal => deque::run_round(&ctx, dataset, workers, Stealing::Disabled)?,
                Mode::DequeSteal => deque::run_round(&ctx, dataset, workers, Stealing::Enabled)?,
            };
            let elapsed = round_started.elapsed();

            let metrics = Metrics::from_counters(outcome.counters);
            table.insert(threshold, metrics);
            optimal.update(&metrics, threshold);

            let stats = RoundStats {
                threshold,
                workers: outcome.workers,
                elapsed,
            };
            log::debug!(
                "Round for threshold {} finished in {:?}: precision {}, recall {}, {} stolen",
                threshold,
                elapsed,
                metrics.precision,
                metrics.recall,
                stats.stolen()
            );
            rounds.push(stats);
        }

        let elapsed = started.elapsed();
        log::info!(
            "Sweep finished in {:.2}s: max precision {} at {}, max recall {} at {}",
            elapsed.as_secs_f64(),
            optimal.max_precision,
            optimal.precision_threshold,
            optimal.max_recall,
            optimal.recall_threshold
        );

        Ok(SweepReport {
            mode,
            workers,
            table,
            optimal,
            rounds,
            elapsed,
        })
    }
}
