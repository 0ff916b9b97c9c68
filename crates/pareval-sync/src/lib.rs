//! Synchronisation primitives for pareval worker rounds.
//!
//! - [`Barrier`]: reusable rendezvous with a generation counter.
//! - [`WorkStealingDeque`]: per-worker deque, owner pops the bottom, thieves
//!   compare-and-swap the top.
//! - [`PaddedSlots`]: per-worker accumulators on separate cache lines.

mod barrier;
mod deque;
mod padded;

pub use barrier::{ArriveOnDrop, Barrier, BarrierWaitResult};
pub use deque::{Owner, WorkStealingDeque};
pub use padded::{PaddedSlots, CACHE_LINE_SIZE};
