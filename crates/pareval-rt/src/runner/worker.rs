// pareval-rt/src/runner/worker.rs

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::Backoff;
use pareval_metrics::Counters;
use pareval_sync::{Owner, PaddedSlots, WorkStealingDeque};
use rand::Rng;

use super::RoundContext;
use crate::types::{Task, WorkerId};

/// What one worker did during a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Records this worker scored, its own and stolen ones.
    pub processed: usize,
    /// Records this worker took from another worker's deque.
    pub stolen: usize,
}

/// A deque-mode worker for one round.
///
/// Holds the only [`Owner`] handle of its own deque and read access to every
/// deque of the round for stealing. Counters go straight into the worker's
/// padded slot, which it keeps locked for the whole round.
pub(crate) struct DequeWorker<'r> {
    pub id: WorkerId,
    pub owner: Owner<'r, Task<'r>>,
    pub deques: &'r [WorkStealingDeque<Task<'r>>],
    pub idle: &'r AtomicUsize,
    pub slots: &'r PaddedSlots<Counters>,
    pub ctx: &'r RoundContext<'r>,
}

impl<'r> DequeWorker<'r> {
    /// Drains the worker's own deque and stops.
    pub fn run_local(self) -> WorkerStats {
        let mut counters = self.slots.lock(self.id);
        let mut stats = WorkerStats::default();

        while let Some(task) = self.owner.pop_bottom() {
            self.ctx.observe(&mut counters, task.record);
            stats.processed += 1;
        }

        log::trace!("Worker {} drained {} tasks", self.id, stats.processed);
        stats
    }

    /// Drains the worker's own deque, then steals from random victims until
    /// every worker of the round has gone idle.
    ///
    /// Deques are never refilled, so once a worker has seen its own deque
    /// empty it stays idle and the idle count only grows. When the count
    /// reaches the number of workers, a final sweep over all deques confirms
    /// quiescence before the worker exits.
    pub fn run_stealing(self) -> WorkerStats {
        let mut counters = self.slots.lock(self.id);
        let mut stats = WorkerStats::default();
        let workers = self.deques.len();
        let mut idle = IdleMark::new(self.idle);
        let mut rng = rand::rng();
        let backoff = Backoff::new();

        loop {
            if let Some(task) = self.owner.pop_bottom() {
                self.ctx.observe(&mut counters, task.record);
                stats.processed += 1;
                continue;
            }

            if !idle.is_marked() {
                let now_idle = idle.mark();
                log::trace!(
                    "Worker {} idle after {} tasks ({}/{} idle)",
                    self.id,
                    stats.processed,
                    now_idle,
                    workers
                );
            }

            if idle.count() == workers {
                match self.sweep() {
                    Some(task) => {
                        self.ctx.observe(&mut counters, task.record);
                        stats.processed += 1;
                        stats.stolen += 1;
                        continue;
                    }
                    None => break,
                }
            }

            let victim = pick_victim(&mut rng, self.id, workers);
            match self.deques[victim].pop_top() {
                Some(task) => {
                    self.ctx.observe(&mut counters, task.record);
                    stats.processed += 1;
                    stats.stolen += 1;
                    backoff.reset();
                }
                None => backoff.spin(),
            }
        }

        log::trace!(
            "Worker {} exiting: {} processed, {} stolen",
            self.id,
            stats.processed,
            stats.stolen
        );
        stats
    }

    /// One pass over every other deque, returning the first task found.
    fn sweep(&self) -> Option<Task<'r>> {
        let workers = self.deques.len();
        (1..workers)
            .map(|offset| (self.id + offset) % workers)
            .find_map(|victim| self.deques[victim].pop_top())
    }
}

/// Counts a worker as idle exactly once: explicitly through [`IdleMark::mark`],
/// or on drop if the worker unwinds before reaching that point.
struct IdleMark<'r> {
    idle: &'r AtomicUsize,
    marked: bool,
}

impl<'r> IdleMark<'r> {
    fn new(idle: &'r AtomicUsize) -> Self {
        IdleMark {
            idle,
            marked: false,
        }
    }

    fn is_marked(&self) -> bool {
        self.marked
    }

    /// Marks the worker idle and returns the new idle count.
    fn mark(&mut self) -> usize {
        if self.marked {
            return self.count();
        }
        self.marked = true;
        self.idle.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn count(&self) -> usize {
        self.idle.load(Ordering::SeqCst)
    }
}

impl Drop for IdleMark<'_> {
    fn drop(&mut self) {
        if !self.marked {
            self.idle.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Uniformly random worker index in `0..workers`, excluding `own`.
/// `workers` must be at least 2.
fn pick_victim<R: Rng>(rng: &mut R, own: WorkerId, workers: usize) -> WorkerId {
    let pick = rng.random_range(0..workers - 1);
    if pick >= own {
        pick + 1
    } else {
        pick
    }
}
