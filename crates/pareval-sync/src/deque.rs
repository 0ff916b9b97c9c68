// pareval-sync/src/deque.rs

//! Per-worker double-ended task queue with owner pops and thief steals.
//!
//! The deque is seeded once, before any worker starts, and then only shrinks.
//! Its chain of tasks lives in an arena of slots: slot 0 is a sentinel and
//! slots `1..` hold tasks in push order, linked through `prev`/`next` indices.
//!
//! - The owner pops from the bottom (tail side) through an [`Owner`] handle.
//! - Thieves pop from the top (head side) with [`WorkStealingDeque::pop_top`].
//!
//! `head` is a tagged `(index, generation)` pair packed into one `AtomicU64`.
//! Every successful move of `head` bumps the generation, so a thief holding a
//! stale snapshot can never win a compare-and-swap against a newer head.
//! No raw pointers are involved: slots are never freed while the deque is
//! alive and indices are bounds-checked.

use std::sync::atomic::{fence, AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Sentinel slot index. `head` starts here.
const SENTINEL: usize = 0;

/// Link value for "no neighbour".
const NIL: usize = usize::MAX;

/// Maximum number of slots (sentinel included) addressable by a tagged head.
const MAX_SLOTS: usize = u32::MAX as usize;

/// One arena slot: a task plus its chain linkage.
#[derive(Debug)]
struct Slot<T> {
    item: Option<T>,
    prev: usize,
    next: usize,
}

/// `head` index together with the number of times head has moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tagged {
    index: usize,
    generation: u32,
}

impl Tagged {
    #[inline]
    fn pack(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    #[inline]
    fn unpack(raw: u64) -> Self {
        Tagged {
            index: (raw & 0xFFFF_FFFF) as usize,
            generation: (raw >> 32) as u32,
        }
    }

    #[inline]
    fn advance(self, index: usize) -> Self {
        Tagged {
            index,
            generation: self.generation.wrapping_add(1),
        }
    }
}

/// Unbounded (at construction time) per-worker deque.
#[derive(Debug)]
pub struct WorkStealingDeque<T> {
    slots: Vec<Slot<T>>,
    /// Tagged index of the last consumed slot on the top side.
    head: CachePadded<AtomicU64>,
    /// Index of the bottom-most live slot. Written only by the owner.
    tail: CachePadded<AtomicUsize>,
    /// Set while an [`Owner`] handle exists.
    owned: AtomicBool,
}

impl<T> WorkStealingDeque<T> {
    /// Creates an empty deque holding only the sentinel.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty deque with room for `capacity` tasks.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.push(Slot {
            item: None,
            prev: NIL,
            next: NIL,
        });
        WorkStealingDeque {
            slots,
            head: CachePadded::new(AtomicU64::new(
                Tagged {
                    index: SENTINEL,
                    generation: 0,
                }
                .pack(),
            )),
            tail: CachePadded::new(AtomicUsize::new(SENTINEL)),
            owned: AtomicBool::new(false),
        }
    }

    /// Appends a task at the bottom.
    ///
    /// Requires exclusive access, so it can only run while the deque is being
    /// built, before it is shared with any worker.
    ///
    /// # Panics
    /// Panics if the deque already holds `u32::MAX` slots, the most a tagged
    /// head can address.
    pub fn push_bottom(&mut self, item: T) {
        assert!(self.slots.len() < MAX_SLOTS, "work-stealing deque is full");
        let tail = *self.tail.get_mut();
        let index = self.slots.len();
        self.slots.push(Slot {
            item: Some(item),
            prev: tail,
            next: NIL,
        });
        self.slots[tail].next = index;
        *self.tail.get_mut() = index;
    }

    /// Claims the owner role. Returns `None` while another [`Owner`] is alive.
    pub fn owner(&self) -> Option<Owner<'_, T>> {
        self.owned
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Owner { deque: self })
    }

    /// Number of tasks not yet popped. A snapshot; may be stale immediately.
    pub fn len(&self) -> usize {
        let head = Tagged::unpack(self.head.load(Ordering::SeqCst));
        let tail = self.tail.load(Ordering::SeqCst);
        tail.saturating_sub(head.index)
    }

    /// Snapshot emptiness check.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of tasks pushed during construction.
    pub fn pushed(&self) -> usize {
        self.slots.len() - 1
    }
}

impl<T: Clone> WorkStealingDeque<T> {
    /// Steals the top-most task.
    ///
    /// Returns `None` when the deque is empty or when another party won the
    /// race for the candidate; callers decide whether to retry or move on.
    pub fn pop_top(&self) -> Option<T> {
        let head = Tagged::unpack(self.head.load(Ordering::SeqCst));
        let tail = self.tail.load(Ordering::SeqCst);

        if head.index >= tail {
            return None;
        }

        let candidate = self.slots[head.index].next;
        if candidate == NIL {
            return None;
        }

        self.head
            .compare_exchange(
                head.pack(),
                head.advance(candidate).pack(),
                Ordering::SeqCst,
                Ordering::Relaxed,
            )
            .ok()
            .and_then(|_| self.slots[candidate].item.clone())
    }

    fn pop_bottom(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = Tagged::unpack(self.head.load(Ordering::SeqCst));
        if head.index >= tail {
            return None;
        }

        // Publish the retreat before looking at head again, so a thief that
        // read the old tail is ordered before our head read.
        let retreat = self.slots[tail].prev;
        self.tail.store(retreat, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        let head = Tagged::unpack(self.head.load(Ordering::SeqCst));

        if head.index < retreat {
            // At least one task still sits between head and the retreated
            // tail, so no thief can reach the slot we just detached.
            return self.slots[tail].item.clone();
        }

        let taken = if head.index == retreat {
            // The detached slot is the last task; race thieves for it on head.
            self.head
                .compare_exchange(
                    head.pack(),
                    head.advance(tail).pack(),
                    Ordering::SeqCst,
                    Ordering::Relaxed,
                )
                .is_ok()
        } else {
            // A thief already took it.
            false
        };

        // Either way head now sits on the old tail; restore head == tail.
        self.tail.store(tail, Ordering::SeqCst);
        if taken {
            self.slots[tail].item.clone()
        } else {
            None
        }
    }
}

impl<T> Default for WorkStealingDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for WorkStealingDeque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut deque = Self::with_capacity(iter.size_hint().0);
        for item in iter {
            deque.push_bottom(item);
        }
        deque
    }
}

/// Exclusive handle for the bottom end of a [`WorkStealingDeque`].
///
/// At most one exists per deque; it is not `Clone`, so bottom pops can only
/// ever come from the single thread holding it.
#[derive(Debug)]
pub struct Owner<'d, T> {
    deque: &'d WorkStealingDeque<T>,
}

impl<'d, T: Clone> Owner<'d, T> {
    /// Pops the bottom-most task, or `None` once the deque is empty.
    pub fn pop_bottom(&self) -> Option<T> {
        self.deque.pop_bottom()
    }
}

impl<T> Drop for Owner<'_, T> {
    fn drop(&mut self) {
        self.deque.owned.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_empty_deque() {
        let deque: WorkStealingDeque<usize> = WorkStealingDeque::new();
        let owner = deque.owner().unwrap();
        assert!(deque.is_empty());
        assert_eq!(owner.pop_bottom(), None);
        assert_eq!(deque.pop_top(), None);
    }

    #[test]
    fn test_owner_pops_lifo_thief_pops_fifo() {
        let deque: WorkStealingDeque<usize> = (1..=4).collect();
        let owner = deque.owner().unwrap();
        assert_eq!(deque.len(), 4);
        assert_eq!(owner.pop_bottom(), Some(4));
        assert_eq!(deque.pop_top(), Some(1));
        assert_eq!(owner.pop_bottom(), Some(3));
        assert_eq!(deque.pop_top(), Some(2));
        assert_eq!(owner.pop_bottom(), None);
        assert_eq!(deque.pop_top(), None);
        assert!(deque.is_empty());
    }

    #[test]
    fn test_single_task_goes_to_owner_once() {
        let deque: WorkStealingDeque<&str> = std::iter::once("only").collect();
        let owner = deque.owner().unwrap();
        assert_eq!(owner.pop_bottom(), Some("only"));
        assert_eq!(owner.pop_bottom(), None);
        assert_eq!(deque.pop_top(), None);
    }

    #[test]
    fn test_single_task_stolen_then_owner_sees_empty() {
        let deque: WorkStealingDeque<u8> = std::iter::once(7).collect();
        let owner = deque.owner().unwrap();
        assert_eq!(deque.pop_top(), Some(7));
        assert_eq!(owner.pop_bottom(), None);
        assert!(deque.is_empty());
    }

    #[test]
    fn test_owner_is_exclusive() {
        let deque: WorkStealingDeque<u8> = WorkStealingDeque::new();
        let first = deque.owner();
        assert!(first.is_some());
        assert!(deque.owner().is_none());
        drop(first);
        assert!(deque.owner().is_some());
    }

    #[test]
    fn test_stale_head_snapshot_cannot_win() {
        let deque: WorkStealingDeque<usize> = (0..3).collect();
        let stale = deque.head.load(Ordering::SeqCst);
        assert_eq!(deque.pop_top(), Some(0));
        let fresh = Tagged::unpack(deque.head.load(Ordering::SeqCst));
        assert_eq!(fresh.generation, 1);
        assert!(deque
            .head
            .compare_exchange(stale, fresh.advance(2).pack(), Ordering::SeqCst, Ordering::SeqCst)
            .is_err());
    }

    fn contended_run(tasks: usize, thieves: usize) {
        let deque: WorkStealingDeque<usize> = (0..tasks).collect();
        let done = AtomicBool::new(false);

        let (mine, stolen) = thread::scope(|s| {
            let handles: Vec<_> = (0..thieves)
                .map(|_| {
                    s.spawn(|| {
                        let mut got = Vec::new();
                        while !done.load(Ordering::SeqCst) || !deque.is_empty() {
                            if let Some(task) = deque.pop_top() {
                                got.push(task);
                            }
                        }
                        got
                    })
                })
                .collect();

            let owner = deque.owner().unwrap();
            let mut mine = Vec::new();
            while let Some(task) = owner.pop_bottom() {
                mine.push(task);
            }
            done.store(true, Ordering::SeqCst);

            let stolen: Vec<usize> = handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect();
            (mine, stolen)
        });

        let mut seen = HashSet::with_capacity(tasks);
        for task in mine.iter().chain(stolen.iter()) {
            assert!(seen.insert(*task), "task {} returned twice", task);
        }
        assert_eq!(seen.len(), tasks, "tasks were lost");
    }

    #[test]
    fn test_every_task_returned_exactly_once_under_contention() {
        for _ in 0..20 {
            contended_run(2_000, 3);
        }
    }

    #[test]
    fn test_small_deques_under_contention() {
        for tasks in 0..8 {
            for _ in 0..200 {
                contended_run(tasks, 2);
            }
        }
    }
}
