// pareval-sync/src/barrier.rs

use parking_lot::{Condvar, Mutex};

/// Arrival state guarded by the barrier mutex.
#[derive(Debug, Default)]
struct BarrierState {
    /// Parties that have arrived in the current generation.
    arrived: usize,
    /// Number of completed rounds. A waiter only leaves once the
    /// generation it joined has been closed by the final arrival.
    generation: u64,
}

/// A reusable rendezvous point for a known number of parties.
///
/// Every call to [`Barrier::wait`] blocks until `parties` calls have been made
/// in the same round. The final arrival closes the round by bumping an internal
/// generation counter, so the barrier can be reused immediately without any
/// caller-side counter reset.
#[derive(Debug)]
pub struct Barrier {
    state: Mutex<BarrierState>,
    cvar: Condvar,
    parties: usize,
}

/// Returned by [`Barrier::wait`]. Exactly one party per round is the leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    leader: bool,
    generation: u64,
}

impl BarrierWaitResult {
    /// True for the party whose arrival released the round.
    pub fn is_leader(&self) -> bool {
        self.leader
    }

    /// The generation (round number) this party took part in.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Barrier {
    /// Creates a barrier for `parties` parties with zero arrivals.
    pub fn new(parties: usize) -> Self {
        Barrier {
            state: Mutex::new(BarrierState::default()),
            cvar: Condvar::new(),
            parties,
        }
    }

    /// Number of parties each round waits for.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Number of completed rounds.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Reconfigures the party count for the following rounds.
    ///
    /// Taking `&mut self` means no other thread can be inside [`Barrier::wait`]
    /// while the count changes, which is what makes reconfiguration between
    /// rounds sound.
    pub fn set_parties(&mut self, parties: usize) {
        let state = self.state.get_mut();
        debug_assert_eq!(state.arrived, 0, "barrier reconfigured mid-round");
        state.arrived = 0;
        self.parties = parties;
    }

    /// Blocks the calling party until all parties of the current round have arrived.
    pub fn wait(&self) -> BarrierWaitResult {
        let mut state = self.state.lock();
        let generation = state.generation;
        state.arrived += 1;

        if state.arrived < self.parties {
            // Spurious wakeups and wakeups for later rounds are filtered by the generation check.
            while state.generation == generation {
                self.cvar.wait(&mut state);
            }
            BarrierWaitResult {
                leader: false,
                generation,
            }
        } else {
            state.arrived = 0;
            state.generation = generation.wrapping_add(1);
            self.cvar.notify_all();
            log::trace!("Barrier round {} released ({} parties)", generation, self.parties);
            BarrierWaitResult {
                leader: true,
                generation,
            }
        }
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Barrier::new(0)
    }
}

/// Calls [`Barrier::wait`] when dropped.
///
/// Workers hold one of these for the duration of their chunk so that a
/// panicking worker still arrives and the coordinator is not left blocked.
#[derive(Debug)]
pub struct ArriveOnDrop<'b> {
    barrier: &'b Barrier,
}

impl<'b> ArriveOnDrop<'b> {
    pub fn new(barrier: &'b Barrier) -> Self {
        ArriveOnDrop { barrier }
    }
}

impl Drop for ArriveOnDrop<'_> {
    fn drop(&mut self) {
        self.barrier.wait();
    }
}
