//! Thread-Safe Expiring Store
//!
//! This module implements the core store for ttlkv: a concurrent map in
//! which every entry carries its own TTL and disappears once that TTL
//! elapses unless it is renewed.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys hash onto 64 shards, so writers on different
//!    keys rarely meet on the same lock.
//! 2. **Two maps per shard**: the value map answers "what does this key
//!    hold", the expiry registry answers "is it alive". Both are guarded by
//!    their own `RwLock`, always taken registry first.
//! 3. **One expiration queue**: tickets from every shard wait in a single
//!    time-ordered queue.
//! 4. **Lazy sweep**: every public operation drains the due tickets from the
//!    queue before doing its own work. No thread is required; the optional
//!    [`ExpirySweeper`](crate::storage::ExpirySweeper) only makes it eager.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ExpiringStore                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │registry │ │registry │ │registry │ │registry │           │
//! │  │ values  │ │ values  │ │ values  │ │ values  │           │
//! │  └────┬────┘ └────┬────┘ └────┬────┘ └────┬────┘           │
//! │       └───────────┴─────┬─────┴───────────┘                 │
//! │                         ▼                                   │
//! │               ┌───────────────────┐                         │
//! │               │  ExpirationQueue  │                         │
//! │               └───────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `put` holds its shard's registry and value locks while it tombstones
//! the old ticket, installs the new one, enqueues it and writes the value,
//! so two `put`s on the same key serialize and the registry never ends up
//! pointing at the older ticket.
//!
//! The sweep only deletes a key if, under the shard's registry write lock,
//! the registry still maps that key to the exact ticket it dequeued and that
//! ticket is still due. A key renewed or replaced in the meantime survives.

use crate::error::{Result, StoreError};
use crate::storage::config::StoreConfig;
use crate::storage::queue::ExpirationQueue;
use crate::storage::ticket::ExpirationTicket;
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, trace};

/// Number of shards for the store.
const NUM_SHARDS: usize = 64;

type Registry<K> = HashMap<K, Arc<ExpirationTicket<K>>>;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// A single shard containing a portion of the keys.
#[derive(Debug)]
struct Shard<K, V> {
    /// Current ticket per key
    registry: RwLock<Registry<K>>,
    /// Current value per key
    values: RwLock<HashMap<K, V>>,
}

impl<K, V> Shard<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: RwLock::new(HashMap::with_capacity(capacity)),
            values: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }
}

/// A concurrent key-value store with a TTL on every entry.
///
/// Wrap it in an `Arc` to share it between threads or tasks; every method
/// takes `&self`.
///
/// # Example
///
/// ```
/// use ttlkv::storage::ExpiringStore;
/// use std::time::Duration;
///
/// let store = ExpiringStore::new(16, Duration::from_secs(60));
///
/// store.put("session", "token123");
/// assert_eq!(store.get("session"), Some("token123"));
///
/// // A TTL of zero expires on the next operation
/// store.put_with_ttl("flash", "gone", Duration::ZERO);
/// assert!(!store.contains_key("flash"));
/// ```
pub struct ExpiringStore<K, V> {
    shards: Vec<Shard<K, V>>,
    queue: ExpirationQueue<K>,
    config: StoreConfig,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: GET operations that found a live key
    hit_count: AtomicU64,

    /// Statistics: total PUT operations
    put_count: AtomicU64,

    /// Statistics: REMOVE operations that removed a live key
    remove_count: AtomicU64,

    /// Statistics: successful renewals, explicit or on read
    renew_count: AtomicU64,

    /// Statistics: keys evicted by the sweep
    expired_count: AtomicU64,
}

impl<K, V> std::fmt::Debug for ExpiringStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("shards", &self.shards.len())
            .field("pending_tickets", &self.queue.len())
            .field("config", &self.config)
            .field("expired_count", &self.expired_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl<K, V> Default for ExpiringStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::with_config(StoreConfig::default())
    }
}

impl<K, V> ExpiringStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a store sized for `initial_capacity` entries whose `put`
    /// uses `default_ttl`.
    pub fn new(initial_capacity: usize, default_ttl: Duration) -> Self {
        Self::with_config(
            StoreConfig::default()
                .with_initial_capacity(initial_capacity)
                .with_default_ttl(default_ttl),
        )
    }

    /// Creates a store from a full configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        let per_shard = config.initial_capacity.div_ceil(NUM_SHARDS);
        let shards = (0..NUM_SHARDS)
            .map(|_| Shard::with_capacity(per_shard))
            .collect();

        Self {
            shards,
            queue: ExpirationQueue::with_capacity(config.initial_capacity),
            config,
            get_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            put_count: AtomicU64::new(0),
            remove_count: AtomicU64::new(0),
            renew_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Returns the configuration the store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[inline]
    fn shard_index<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard<Q: Hash + ?Sized>(&self, key: &Q) -> &Shard<K, V> {
        &self.shards[self.shard_index(key)]
    }

    /// Drains every due ticket from the expiration queue and evicts the keys
    /// they still govern.
    ///
    /// Runs automatically at the start of every public operation; call it
    /// directly (or run an [`ExpirySweeper`](crate::storage::ExpirySweeper))
    /// to reclaim memory held by keys nobody touches.
    ///
    /// # Returns
    ///
    /// Returns the number of keys evicted.
    pub fn sweep(&self) -> u64 {
        let mut expired = 0u64;

        while let Some(ticket) = self.queue.poll_due() {
            if self.evict(&ticket) {
                expired += 1;
            }
        }

        if expired > 0 {
            self.expired_count.fetch_add(expired, Ordering::Relaxed);
            debug!(
                expired = expired,
                remaining = self.stored_len(),
                "Swept expired keys"
            );
        }

        expired
    }

    /// Removes the key governed by a dequeued ticket if that ticket is still
    /// the key's current one and is still due.
    fn evict(&self, ticket: &Arc<ExpirationTicket<K>>) -> bool {
        if ticket.is_tombstoned() {
            trace!("Discarded tombstoned ticket");
            return false;
        }

        let shard = self.get_shard(ticket.key());
        let mut registry = write(&shard.registry);

        // Replacing a key's ticket tombstones it under this same lock, so
        // an untombstoned ticket is still the current one
        if ticket.is_tombstoned() {
            trace!("Discarded ticket tombstoned before eviction");
            return false;
        }
        debug_assert!(registry
            .get(ticket.key())
            .is_some_and(|current| Arc::ptr_eq(current, ticket)));

        if !ticket.is_due() {
            // Renewed between the poll and the lock
            trace!("Requeued renewed ticket");
            self.queue.enqueue(Arc::clone(ticket));
            return false;
        }

        registry.remove(ticket.key());
        write(&shard.values).remove(ticket.key());
        trace!(ttl_ms = ticket.ttl_millis(), "Evicted expired key");
        true
    }

    /// Inserts a value with the store's default TTL.
    ///
    /// # Returns
    ///
    /// Returns the previous live value for the key, if any.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.put_with_ttl_millis(key, value, self.config.default_ttl_millis())
    }

    /// Inserts a value that expires after `ttl`.
    ///
    /// # Returns
    ///
    /// Returns the previous live value for the key, if any.
    pub fn put_with_ttl(&self, key: K, value: V, ttl: Duration) -> Option<V> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.put_with_ttl_millis(key, value, ttl_millis)
    }

    /// Inserts a value that expires after `ttl_millis` milliseconds.
    ///
    /// Zero and negative TTLs are accepted: the entry is evicted by the next
    /// sweep. Any earlier ticket for the key is tombstoned, so only this
    /// insertion's TTL governs the key from now on.
    ///
    /// # Returns
    ///
    /// Returns the previous live value for the key, if any.
    pub fn put_with_ttl_millis(&self, key: K, value: V, ttl_millis: i64) -> Option<V> {
        self.put_count.fetch_add(1, Ordering::Relaxed);
        self.sweep();

        let ticket = Arc::new(ExpirationTicket::new(key.clone(), ttl_millis));
        let shard = self.get_shard(&key);
        let mut registry = write(&shard.registry);
        let mut values = write(&shard.values);

        let previous_live = match registry.insert(key.clone(), Arc::clone(&ticket)) {
            Some(previous) => {
                let live = !previous.is_due();
                self.queue.tombstone(&previous);
                live
            }
            None => false,
        };
        self.queue.enqueue(ticket);

        values.insert(key, value).filter(|_| previous_live)
    }

    /// Gets the value for a key.
    ///
    /// A hit restarts the key's TTL window unless the store was configured
    /// with `renew_on_read(false)`.
    ///
    /// Returns `None` if the key was never inserted, was removed, or expired.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.sweep();

        let shard = self.get_shard(key);
        let registry = read(&shard.registry);
        let ticket = registry.get(key).filter(|ticket| !ticket.is_due())?;

        if self.config.renew_on_read {
            ticket.renew();
            self.renew_count.fetch_add(1, Ordering::Relaxed);
        }

        let value = read(&shard.values).get(key).cloned();
        if value.is_some() {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Restarts the TTL window of a live key without reading its value.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was live and has been renewed.
    pub fn renew_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.sweep();

        let registry = read(&self.get_shard(key).registry);
        match registry.get(key) {
            Some(ticket) if !ticket.is_due() => {
                ticket.renew();
                self.renew_count.fetch_add(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Removes a key and tombstones its ticket.
    ///
    /// # Returns
    ///
    /// Returns the removed value if the key was live.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.sweep();

        let shard = self.get_shard(key);
        let mut registry = write(&shard.registry);
        let mut values = write(&shard.values);

        let was_live = match registry.remove(key) {
            Some(ticket) => {
                let live = !ticket.is_due();
                self.queue.tombstone(&ticket);
                live
            }
            None => false,
        };

        let removed = values.remove(key).filter(|_| was_live);
        if removed.is_some() {
            self.remove_count.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Returns the time left before a key expires, without renewing it.
    ///
    /// Returns `None` if the key is not live.
    pub fn remaining_ttl<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.sweep();

        let registry = read(&self.get_shard(key).registry);
        registry.get(key).and_then(|ticket| ticket.remaining())
    }

    /// Checks if a key is live. Does not renew it.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.sweep();

        let registry = read(&self.get_shard(key).registry);
        registry.get(key).is_some_and(|ticket| !ticket.is_due())
    }

    /// Checks if any live key holds `value`.
    ///
    /// **Warning**: This scans every shard.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.sweep();

        self.shards
            .iter()
            .any(|shard| read(&shard.values).values().any(|v| v == value))
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> usize {
        self.sweep();
        self.stored_len()
    }

    /// Returns true if no key is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored values, without sweeping first.
    pub(crate) fn stored_len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| read(&shard.values).len())
            .sum()
    }

    /// Returns a snapshot of the live keys.
    ///
    /// **Warning**: This scans every shard.
    pub fn keys(&self) -> HashSet<K> {
        self.sweep();

        let mut keys = HashSet::with_capacity(self.stored_len());
        for shard in &self.shards {
            keys.extend(read(&shard.values).keys().cloned());
        }
        keys
    }

    /// Removes every entry and tombstones every ticket.
    pub fn clear(&self) {
        for shard in &self.shards {
            let mut registry = write(&shard.registry);
            let mut values = write(&shard.values);

            for ticket in registry.values() {
                self.queue.tombstone(ticket);
            }
            registry.clear();
            values.clear();
        }
        debug!("Store cleared");
    }

    /// Bulk value iteration is not supported.
    ///
    /// Always fails with [`StoreError::Unsupported`]; read keys one at a
    /// time with [`get`](Self::get).
    pub fn values(&self) -> Result<Vec<V>> {
        Err(StoreError::unsupported("values"))
    }

    /// Multi-entry insert is not supported.
    ///
    /// Always fails with [`StoreError::Unsupported`] without inserting
    /// anything; insert entries one at a time with [`put`](Self::put).
    pub fn put_all<I>(&self, _entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Err(StoreError::unsupported("put_all"))
    }

    /// Number of tickets waiting in the expiration queue, including
    /// superseded ones not yet purged.
    pub fn pending_tickets(&self) -> usize {
        self.queue.len()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.stored_len() as u64,
            get_ops: self.get_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            put_ops: self.put_count.load(Ordering::Relaxed),
            removed: self.remove_count.load(Ordering::Relaxed),
            renewals: self.renew_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of values currently stored (as of the last sweep)
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// GET operations that returned a value
    pub hits: u64,
    /// Total PUT operations
    pub put_ops: u64,
    /// Live keys removed explicitly
    pub removed: u64,
    /// Successful renewals
    pub renewals: u64,
    /// Keys evicted because their TTL elapsed
    pub expired: u64,
}
