// pareval-rt/src/runner/sequential.rs

use pareval_metrics::Counters;

use super::{RoundContext, RoundOutcome, WorkerStats};
use crate::dataset::Dataset;

/// The whole dataset as one chunk, on the calling thread.
pub(super) fn run_round(ctx: &RoundContext<'_>, dataset: &Dataset) -> RoundOutcome {
    let mut counters = Counters::default();
    for record in dataset.records() {
        ctx.observe(&mut counters, record);
    }
    RoundOutcome {
        counters,
        workers: vec![WorkerStats {
            processed: dataset.len(),
            stolen: 0,
        }],
    }
}
