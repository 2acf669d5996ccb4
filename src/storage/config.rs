//! Store configuration.

use std::time::Duration;

/// Default TTL applied by [`ExpiringStore::put`](crate::storage::ExpiringStore::put).
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default sizing hint for a new store.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Configuration for an [`ExpiringStore`](crate::storage::ExpiringStore).
///
/// # Example
///
/// ```
/// use ttlkv::storage::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_initial_capacity(1024)
///     .with_default_ttl(Duration::from_secs(30))
///     .renew_on_read(false);
/// assert!(!config.renew_on_read);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Expected number of entries. A sizing hint, not a cap.
    pub initial_capacity: usize,

    /// TTL used when `put` is called without one (default: 60s)
    pub default_ttl: Duration,

    /// Whether `get` restarts the key's TTL window (default: true).
    ///
    /// With `true` the TTL slides on every read; with `false` a key dies at
    /// a fixed deadline unless `renew_key` or a new `put` extends it.
    pub renew_on_read: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            default_ttl: DEFAULT_TTL,
            renew_on_read: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expected number of entries.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the TTL used by `put`.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Chooses between sliding (`true`) and fixed-deadline (`false`) TTLs.
    pub fn renew_on_read(mut self, renew: bool) -> Self {
        self.renew_on_read = renew;
        self
    }

    /// The default TTL in whole milliseconds, saturating at `i64::MAX`.
    pub(crate) fn default_ttl_millis(&self) -> i64 {
        i64::try_from(self.default_ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert_eq!(config.default_ttl, Duration::from_secs(60));
        assert!(config.renew_on_read);
        assert_eq!(config.default_ttl_millis(), 60_000);
    }

    #[test]
    fn test_builder_pattern_chaining() {
        let config = StoreConfig::new()
            .with_initial_capacity(10)
            .with_default_ttl(Duration::from_millis(5000))
            .renew_on_read(false);

        assert_eq!(config.initial_capacity, 10);
        assert_eq!(config.default_ttl_millis(), 5000);
        assert!(!config.renew_on_read);
    }

    #[test]
    fn test_default_ttl_saturates() {
        let config = StoreConfig::new().with_default_ttl(Duration::MAX);
        assert_eq!(config.default_ttl_millis(), i64::MAX);
    }
}
