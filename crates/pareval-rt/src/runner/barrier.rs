// pareval-rt/src/runner/barrier.rs

use std::thread;

use pareval_metrics::Counters;
use pareval_sync::{ArriveOnDrop, Barrier, PaddedSlots};

use super::{joined, RoundContext, RoundOutcome, WorkerStats};
use crate::dataset::Dataset;
use crate::error::RuntimeError;
use crate::partition::chunk_bounds;

/// Static chunks, one scoped thread each. Workers and the coordinator meet at
/// the barrier; the coordinator reduces once it is released.
pub(super) fn run_round(
    ctx: &RoundContext<'_>,
    dataset: &Dataset,
    workers: usize,
    barrier: &mut Barrier,
) -> Result<RoundOutcome, RuntimeError> {
    // Workers plus the coordinator.
    barrier.set_parties(workers + 1);
    let barrier = &*barrier;

    let chunks = chunk_bounds(dataset.len(), workers);
    let slots: PaddedSlots<Counters> = PaddedSlots::new(workers);
    let records = dataset.records();

    thread::scope(|s| -> Result<RoundOutcome, RuntimeError> {
        let handles: Vec<_> = chunks
            .into_iter()
            .enumerate()
            .map(|(id, chunk)| {
                let slots = &slots;
                s.spawn(move || {
                    // Declared first so it drops last: the slot guard is
                    // released before this worker arrives at the barrier.
                    let _arrive = ArriveOnDrop::new(barrier);
                    let mut counters = slots.lock(id);
                    for record in &records[chunk.clone()] {
                        ctx.observe(&mut counters, record);
                    }
                    chunk.len()
                })
            })
            .collect();

        barrier.wait();
        let counters: Counters = (0..workers).map(|id| *slots.lock(id)).sum();

        // Every handle is joined before any panic is reported.
        let results: Vec<_> = handles.into_iter().map(|handle| handle.join()).collect();
        let stats = joined(results, ctx.threshold)?
            .into_iter()
            .map(|processed| WorkerStats {
                processed,
                stolen: 0,
            })
            .collect();

        Ok(RoundOutcome {
            counters,
            workers: stats,
        })
    })
}
