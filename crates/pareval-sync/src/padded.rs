// pareval-sync/src/padded.rs

//! Per-worker accumulator slots laid out one per cache line.

use crossbeam_utils::CachePadded;
use parking_lot::{Mutex, MutexGuard};

/// Cache line size assumed by the padding, in bytes.
pub const CACHE_LINE_SIZE: usize = std::mem::align_of::<CachePadded<u8>>();

/// A fixed set of per-worker slots, each padded to its own cache line(s).
///
/// Worker `i` locks slot `i` once and keeps the guard for its whole chunk, so
/// the lock is never contended while work is in flight. The coordinator only
/// reads the slots after the round's synchronisation point (barrier or join).
#[derive(Debug)]
pub struct PaddedSlots<T> {
    slots: Vec<CachePadded<Mutex<T>>>,
}

impl<T> PaddedSlots<T> {
    /// Creates `len` slots, each initialised by `init`.
    pub fn new_with(len: usize, mut init: impl FnMut() -> T) -> Self {
        PaddedSlots {
            slots: (0..len).map(|_| CachePadded::new(Mutex::new(init()))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Locks slot `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn lock(&self, index: usize) -> MutexGuard<'_, T> {
        self.slots[index].lock()
    }

    /// Consumes the slots, yielding their values in worker order.
    pub fn into_values(self) -> impl Iterator<Item = T> {
        self.slots
            .into_iter()
            .map(|slot| CachePadded::into_inner(slot).into_inner())
    }
}

impl<T: Default> PaddedSlots<T> {
    pub fn new(len: usize) -> Self {
        Self::new_with(len, T::default)
    }
}
