//! Background Expiry Sweeper
//!
//! The store already sweeps lazily: every operation drains the due tickets
//! before doing its own work. A key that expires while nobody touches the
//! store, though, keeps its memory until the next call. This module adds the
//! eager side: a Tokio task that calls [`ExpiringStore::sweep`] on an
//! interval.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and:
//! 1. Sleeps for a configurable interval (default: 100ms)
//! 2. Wakes up and sweeps the store
//! 3. Adapts the interval to how many keys expired
//!
//! ## Adaptive Frequency
//!
//! If many keys are expiring, the sweeper will run more frequently.
//! If few keys are expiring, it will back off to save CPU.

use crate::storage::ExpiringStore;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Base interval between sweeps (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// If this fraction of stored keys expired in one sweep, speed up
    pub speedup_threshold: f64,

    /// If this fraction of stored keys expired in one sweep, slow down
    pub slowdown_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ttlkv::storage::{ExpiringStore, ExpirySweeper, ExpiryConfig};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let store: Arc<ExpiringStore<String, String>> =
    ///     Arc::new(ExpiringStore::new(1024, Duration::from_secs(30)));
    /// let sweeper = ExpirySweeper::start(Arc::clone(&store), ExpiryConfig::default());
    ///
    /// // Sweeper runs in the background...
    ///
    /// // Dropping the sweeper will stop it
    /// drop(sweeper);
    /// # }
    /// ```
    pub fn start<K, V>(store: Arc<ExpiringStore<K, V>>, config: ExpiryConfig) -> Self
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(store, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if self.shutdown_tx.send(true).is_ok() {
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop<K, V>(
    store: Arc<ExpiringStore<K, V>>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let mut current_interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let keys_before = store.stored_len();
        let expired = store.sweep();

        let next = next_interval(current_interval, expired, keys_before, &config);
        if next < current_interval {
            debug!(
                expired = expired,
                keys_before = keys_before,
                new_interval_ms = next.as_millis(),
                "High expiry rate, speeding up sweeper"
            );
        } else if next > current_interval {
            trace!(
                new_interval_ms = next.as_millis(),
                "Low expiry rate, slowing down sweeper"
            );
        }
        current_interval = next;
    }
}

/// Picks the next sweep interval from the fraction of stored keys that the
/// last sweep expired.
fn next_interval(
    current: Duration,
    expired: u64,
    keys_before: usize,
    config: &ExpiryConfig,
) -> Duration {
    if keys_before == 0 {
        return current;
    }

    let expiry_rate = expired as f64 / keys_before as f64;
    if expiry_rate > config.speedup_threshold {
        (current / 2).max(config.min_interval)
    } else if expiry_rate < config.slowdown_threshold {
        (current * 2).min(config.max_interval)
    } else {
        current
    }
}

/// Starts the expiry sweeper with default configuration.
pub fn start_expiry_sweeper<K, V>(store: Arc<ExpiringStore<K, V>>) -> ExpirySweeper
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    ExpirySweeper::start(store, ExpiryConfig::default())
}
