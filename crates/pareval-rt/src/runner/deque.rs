// pareval-rt/src/runner/deque.rs

use std::sync::atomic::AtomicUsize;
use std::thread;

use pareval_metrics::Counters;
use pareval_sync::{PaddedSlots, WorkStealingDeque};

use super::worker::DequeWorker;
use super::{joined, RoundContext, RoundOutcome};
use crate::dataset::Dataset;
use crate::error::RuntimeError;
use crate::partition::chunk_bounds;
use crate::types::Task;

/// Whether idle deque workers steal from their peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Stealing {
    Disabled,
    Enabled,
}

/// One fresh deque per worker, seeded with its static chunk in record order.
/// Every deque and owner handle exists before the first worker is spawned.
pub(super) fn run_round(
    ctx: &RoundContext<'_>,
    dataset: &Dataset,
    workers: usize,
    stealing: Stealing,
) -> Result<RoundOutcome, RuntimeError> {
    let records = dataset.records();
    let deques: Vec<WorkStealingDeque<Task<'_>>> = chunk_bounds(records.len(), workers)
        .into_iter()
        .map(|chunk| {
            chunk
                .map(|index| Task {
                    index,
                    record: &records[index],
                })
                .collect()
        })
        .collect();

    let owners = deques
        .iter()
        .enumerate()
        .map(|(id, deque)| deque.owner().ok_or(RuntimeError::DequeOwned(id)))
        .collect::<Result<Vec<_>, _>>()?;

    let idle = AtomicUsize::new(0);
    let slots: PaddedSlots<Counters> = PaddedSlots::new(workers);

    let results = thread::scope(|s| {
        let handles: Vec<_> = owners
            .into_iter()
            .enumerate()
            .map(|(id, owner)| {
                let worker = DequeWorker {
                    id,
                    owner,
                    deques: &deques,
                    idle: &idle,
                    slots: &slots,
                    ctx,
                };
                s.spawn(move || match stealing {
                    Stealing::Disabled => worker.run_local(),
                    Stealing::Enabled => worker.run_stealing(),
                })
            })
            .collect();

        // Join every handle before looking at any result; an unjoined
        // panicked thread would make the scope itself panic.
        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    });
    let stats = joined(results, ctx.threshold)?;

    let pushed: usize = deques.iter().map(WorkStealingDeque::pushed).sum();
    let processed: usize = stats.iter().map(|s| s.processed).sum();
    debug_assert_eq!(pushed, processed, "tasks lost or duplicated");
    debug_assert!(deques.iter().all(WorkStealingDeque::is_empty));

    Ok(RoundOutcome {
        counters: slots.into_values().sum(),
        workers: stats,
    })
}
