//! Error types for ttlkv.
//!
//! Absence of a key is never an error: lookups return `Option` and
//! renewals return `bool`. The only failure the store reports is an
//! attempt to use a bulk operation that it deliberately does not provide.

use thiserror::Error;

/// Errors returned by [`ExpiringStore`](crate::storage::ExpiringStore).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The operation is part of a general map surface the store refuses
    /// to emulate (bulk value iteration, multi-entry insert).
    #[error("unsupported operation: {operation}")]
    Unsupported {
        /// Name of the rejected operation
        operation: &'static str,
    },
}

impl StoreError {
    pub(crate) fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }
}

/// Result type for store operations that can fail.
pub type Result<T> = std::result::Result<T, StoreError>;
