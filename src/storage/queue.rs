//! Expiration Queue
//!
//! A min-heap of [`ExpirationTicket`]s ordered by when they become due.
//! The sweep polls it without blocking: [`ExpirationQueue::poll_due`] hands
//! back one ticket whose delay has elapsed, or `None` if nothing is due yet.
//!
//! ## Keeping the order current
//!
//! A ticket's remaining delay is `deadline - now`. Comparing two tickets at
//! the same instant cancels `now`, so the heap orders by deadline. Deadlines
//! are not fixed, though: the ticket is shared with the registry and can be
//! renewed (deadline moves later) or tombstoned (deadline becomes
//! `i64::MIN`) while it sits in the heap. `BinaryHeap` must never see an
//! element's ordering change underneath it, so each slot carries the
//! deadline it was last sorted by and the queue reconciles that key with
//! the ticket's live state:
//!
//! - **Renewal** only ever pushes a deadline later, so a stale key makes a
//!   ticket surface early, never late. When a surfaced ticket turns out to
//!   be renewed it is re-keyed and pushed back.
//! - **Tombstoning** pulls a deadline earlier. Re-sorting the old slot would
//!   mean finding it, so [`ExpirationQueue::tombstone`] pushes a second slot
//!   for the ticket keyed at `i64::MIN` instead. That slot surfaces on the
//!   next poll; the old one is dropped without being yielded whenever it
//!   reaches the top.
//!
//! Stale slots of long-lived tickets are compacted away once they make up
//! more than half of a large heap.

use crate::storage::ticket::{now_millis, ExpirationTicket};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// A heap slot: a ticket plus the deadline it is currently sorted by.
#[derive(Debug)]
struct Queued<K> {
    deadline_millis: i64,
    ticket: Arc<ExpirationTicket<K>>,
}

impl<K> Queued<K> {
    fn new(ticket: Arc<ExpirationTicket<K>>) -> Self {
        Self {
            deadline_millis: ticket.deadline_millis(),
            ticket,
        }
    }
}

impl<K> PartialEq for Queued<K> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline_millis == other.deadline_millis
    }
}

impl<K> Eq for Queued<K> {}

impl<K> PartialOrd for Queued<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Queued<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest deadline on top
        other.deadline_millis.cmp(&self.deadline_millis)
    }
}

/// Sort key of the extra slot pushed for a tombstoned ticket.
const TOMBSTONE_DEADLINE: i64 = i64::MIN;

/// Heaps smaller than this are never compacted.
const COMPACT_FLOOR: usize = 1024;

#[derive(Debug)]
struct QueueState<K> {
    heap: BinaryHeap<Queued<K>>,
    /// Upper bound on slots held for tombstoned tickets
    stale: usize,
}

impl<K> QueueState<K> {
    fn should_compact(&self) -> bool {
        self.heap.len() >= COMPACT_FLOOR && self.stale > self.heap.len() / 2
    }

    /// Drops every slot held for a tombstoned ticket.
    fn compact(&mut self) {
        self.heap.retain(|slot| !slot.ticket.is_tombstoned());
        self.stale = 0;
    }
}

/// Time-ordered queue of expiration tickets.
///
/// All methods take `&self`; the heap sits behind a mutex that is held only
/// for the duration of a single push or poll.
#[derive(Debug)]
pub struct ExpirationQueue<K> {
    state: Mutex<QueueState<K>>,
}

impl<K> Default for ExpirationQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ExpirationQueue<K> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty queue with room for `capacity` tickets.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::with_capacity(capacity),
                stale: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a ticket, ordered by its current deadline. O(log n).
    pub fn enqueue(&self, ticket: Arc<ExpirationTicket<K>>) {
        self.lock().heap.push(Queued::new(ticket));
    }

    /// Tombstones a queued ticket and makes it due on the next poll.
    ///
    /// O(log n): the ticket gets one extra slot at the front of the heap, and
    /// the slot it already had is discarded once it surfaces.
    pub fn tombstone(&self, ticket: &Arc<ExpirationTicket<K>>) {
        let mut state = self.lock();
        ticket.tombstone();
        state.heap.push(Queued {
            deadline_millis: TOMBSTONE_DEADLINE,
            ticket: Arc::clone(ticket),
        });
        state.stale = state.stale.saturating_add(2);

        if state.should_compact() {
            let before = state.heap.len();
            state.compact();
            trace!(before, after = state.heap.len(), "Compacted expiration queue");
        }
    }

    /// Removes and returns one ticket whose delay has elapsed.
    ///
    /// Never blocks. Returns `None` when no ticket is currently due.
    /// Tombstoned tickets are always due.
    pub fn poll_due(&self) -> Option<Arc<ExpirationTicket<K>>> {
        let mut state = self.lock();
        let now = now_millis();

        loop {
            if state.heap.peek()?.deadline_millis > now {
                return None;
            }

            let slot = state.heap.pop()?;
            if slot.ticket.is_tombstoned() {
                state.stale = state.stale.saturating_sub(1);
                if slot.deadline_millis == TOMBSTONE_DEADLINE {
                    return Some(slot.ticket);
                }
                // Original slot of a ticket already handed out as tombstoned
                continue;
            }

            let live_deadline = slot.ticket.deadline_millis();
            if live_deadline > now {
                // Renewed while queued: sort it by its new deadline
                state.heap.push(Queued {
                    deadline_millis: live_deadline,
                    ticket: slot.ticket,
                });
                continue;
            }

            return Some(slot.ticket);
        }
    }

    /// Number of slots held, including those of tombstoned tickets that
    /// have not surfaced yet.
    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    /// Returns true if the queue holds no tickets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ticket(key: &'static str, ttl_millis: i64) -> Arc<ExpirationTicket<&'static str>> {
        Arc::new(ExpirationTicket::new(key, ttl_millis))
    }

    #[test]
    fn test_poll_empty() {
        let queue: ExpirationQueue<&str> = ExpirationQueue::new();
        assert!(queue.poll_due().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_poll_nothing_due() {
        let queue = ExpirationQueue::new();
        queue.enqueue(ticket("a", 10_000));
        queue.enqueue(ticket("b", 20_000));

        assert!(queue.poll_due().is_none());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_poll_yields_in_deadline_order() {
        let queue = ExpirationQueue::new();
        queue.enqueue(ticket("late", -10));
        queue.enqueue(ticket("future", 10_000));
        queue.enqueue(ticket("early", -500));

        assert_eq!(*queue.poll_due().unwrap().key(), "early");
        assert_eq!(*queue.poll_due().unwrap().key(), "late");
        assert!(queue.poll_due().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_ticket_due_after_delay() {
        let queue = ExpirationQueue::new();
        queue.enqueue(ticket("key", 30));

        assert!(queue.poll_due().is_none());
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(*queue.poll_due().unwrap().key(), "key");
    }

    #[test]
    fn test_tombstoned_ticket_surfaces_immediately() {
        let queue = ExpirationQueue::new();
        let long_lived = ticket("key", 60_000);
        queue.enqueue(Arc::clone(&long_lived));
        queue.enqueue(ticket("other", 30_000));

        queue.tombstone(&long_lived);
        assert!(long_lived.is_tombstoned());

        let polled = queue.poll_due().unwrap();
        assert!(Arc::ptr_eq(&polled, &long_lived));
        assert!(queue.poll_due().is_none());
    }

    #[test]
    fn test_tombstone_leaves_other_slots_in_place() {
        let queue = ExpirationQueue::new();
        for _ in 0..100 {
            queue.enqueue(ticket("live", 60_000));
        }
        let replaced = ticket("replaced", 60_000);
        queue.enqueue(Arc::clone(&replaced));

        queue.tombstone(&replaced);
        assert_eq!(queue.len(), 102);

        // Only the tombstone slot comes out; the original stays queued until
        // its own deadline instead of being searched for
        assert!(Arc::ptr_eq(&queue.poll_due().unwrap(), &replaced));
        assert!(queue.poll_due().is_none());
        assert_eq!(queue.len(), 101);
    }

    #[test]
    fn test_stale_slot_dropped_when_it_surfaces() {
        let queue = ExpirationQueue::new();
        let short = ticket("key", 30);
        queue.enqueue(Arc::clone(&short));

        queue.tombstone(&short);
        assert!(Arc::ptr_eq(&queue.poll_due().unwrap(), &short));
        assert_eq!(queue.len(), 1);

        // The original slot reaches the top but the ticket is not yielded twice
        std::thread::sleep(Duration::from_millis(60));
        assert!(queue.poll_due().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stale_slots_are_compacted() {
        let queue = ExpirationQueue::new();
        let live: Vec<_> = (0..10).map(|_| ticket("live", 60_000)).collect();
        for t in &live {
            queue.enqueue(Arc::clone(t));
        }

        let mut current = ticket("hot", i64::MAX);
        queue.enqueue(Arc::clone(&current));
        for _ in 0..5000 {
            let next = ticket("hot", i64::MAX);
            queue.tombstone(&current);
            queue.enqueue(Arc::clone(&next));
            current = next;
        }

        assert!(queue.len() < 2 * COMPACT_FLOOR);
        while let Some(polled) = queue.poll_due() {
            assert!(polled.is_tombstoned());
        }
        assert!(!current.is_tombstoned());
        assert!(live.iter().all(|t| !t.is_tombstoned()));
    }

    #[test]
    fn test_renewed_ticket_is_not_yielded() {
        let queue = ExpirationQueue::new();
        let renewed = ticket("renewed", 200);
        let expiring = ticket("expiring", 240);
        queue.enqueue(Arc::clone(&renewed));
        queue.enqueue(Arc::clone(&expiring));

        // renewed: 200 -> 320, expiring stays at 240, poll at ~280
        std::thread::sleep(Duration::from_millis(120));
        renewed.renew();
        std::thread::sleep(Duration::from_millis(160));

        // "renewed" sits on top with a stale key; it must be re-keyed and
        // must not hide "expiring" underneath it
        let polled = queue.poll_due().unwrap();
        assert!(Arc::ptr_eq(&polled, &expiring));
        assert!(queue.poll_due().is_none());
        assert_eq!(queue.len(), 1);
    }
}
