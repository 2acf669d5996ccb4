//! Expiration Tickets
//!
//! A ticket is the record that tracks one key's current TTL window. It is
//! created by `put`, its anchor is moved forward by a renewal, and it is
//! tombstoned when a newer `put` or an explicit `remove` supersedes it.
//!
//! ```text
//!   anchor                      anchor + ttl
//!     │◄──────── ttl_millis ────────►│
//!     ▼                              ▼
//! ────●──────────────────────────────●────────────► time
//!            remaining delay > 0     │  due (≤ 0)
//! ```
//!
//! Tickets are shared between the expiry registry and the expiration queue
//! through an `Arc`, so the anchor and tombstone flag are atomics: a renewal
//! is visible to the queue without re-inserting the ticket.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Monotonic origin for every ticket timestamp in the process.
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed on the monotonic clock.
#[inline]
pub(crate) fn now_millis() -> i64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    i64::try_from(epoch.elapsed().as_millis()).unwrap_or(i64::MAX)
}

/// The expiration record bound to one key's current TTL window.
#[derive(Debug)]
pub struct ExpirationTicket<K> {
    /// The key this ticket governs
    key: K,
    /// Lifetime granted at creation, never changed afterwards
    ttl_millis: i64,
    /// Start of the current window, reset on renewal
    anchor_millis: AtomicI64,
    /// Set once the ticket has been superseded or removed
    tombstoned: AtomicBool,
}

impl<K> ExpirationTicket<K> {
    /// Creates a ticket anchored at the current time.
    ///
    /// Zero and negative TTLs are accepted; such a ticket is due immediately.
    pub fn new(key: K, ttl_millis: i64) -> Self {
        Self {
            key,
            ttl_millis,
            anchor_millis: AtomicI64::new(now_millis()),
            tombstoned: AtomicBool::new(false),
        }
    }

    /// Returns the key this ticket governs.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the TTL the ticket was created with.
    pub fn ttl_millis(&self) -> i64 {
        self.ttl_millis
    }

    /// Restarts the TTL window from now.
    pub fn renew(&self) {
        self.anchor_millis.store(now_millis(), Ordering::Release);
    }

    /// Marks the ticket as superseded. Irreversible.
    pub fn tombstone(&self) {
        self.tombstoned.store(true, Ordering::Release);
    }

    /// Checks if the ticket has been superseded or removed.
    #[inline]
    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned.load(Ordering::Acquire)
    }

    /// The instant (on the monotonic millisecond clock) at which the ticket
    /// becomes due. Tombstoned tickets report `i64::MIN`.
    #[inline]
    pub fn deadline_millis(&self) -> i64 {
        if self.is_tombstoned() {
            return i64::MIN;
        }
        self.anchor_millis
            .load(Ordering::Acquire)
            .saturating_add(self.ttl_millis)
    }

    /// Milliseconds until the ticket is due; zero or negative once it is.
    pub fn remaining_delay_millis(&self) -> i64 {
        self.deadline_millis().saturating_sub(now_millis())
    }

    /// Checks if the ticket's delay has elapsed (always true once tombstoned).
    #[inline]
    pub fn is_due(&self) -> bool {
        self.remaining_delay_millis() <= 0
    }

    /// Returns the time left before the ticket is due, or `None` if it
    /// already is.
    pub fn remaining(&self) -> Option<Duration> {
        let remaining = self.remaining_delay_millis();
        u64::try_from(remaining)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ticket_is_not_due() {
        let ticket = ExpirationTicket::new("key", 10_000);
        assert!(!ticket.is_due());
        assert!(!ticket.is_tombstoned());
        assert_eq!(ticket.ttl_millis(), 10_000);

        let remaining = ticket.remaining().unwrap();
        assert!(remaining > Duration::from_secs(9) && remaining <= Duration::from_secs(10));
    }

    #[test]
    fn test_zero_and_negative_ttl_are_due() {
        assert!(ExpirationTicket::new("zero", 0).is_due());
        assert!(ExpirationTicket::new("negative", -500).is_due());
        assert_eq!(ExpirationTicket::new("negative", -500).remaining(), None);
    }

    #[test]
    fn test_ticket_becomes_due() {
        let ticket = ExpirationTicket::new(1u32, 30);
        std::thread::sleep(Duration::from_millis(60));
        assert!(ticket.is_due());
    }

    #[test]
    fn test_renew_moves_deadline() {
        let ticket = ExpirationTicket::new(1u32, 100);
        let before = ticket.deadline_millis();

        std::thread::sleep(Duration::from_millis(20));
        ticket.renew();

        assert!(ticket.deadline_millis() > before);
        assert!(!ticket.is_due());
    }

    #[test]
    fn test_tombstone_forces_due() {
        let ticket = ExpirationTicket::new("key", i64::MAX);
        assert!(!ticket.is_due());

        ticket.tombstone();

        assert!(ticket.is_due());
        assert_eq!(ticket.deadline_millis(), i64::MIN);
        assert_eq!(ticket.remaining_delay_millis(), i64::MIN);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let ticket = ExpirationTicket::new("key", i64::MAX);
        assert_eq!(ticket.deadline_millis(), i64::MAX);
        assert!(ticket.remaining_delay_millis() > 0);
    }
}
