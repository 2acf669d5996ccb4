//! # ttlkv - A Concurrent Key-Value Store with Per-Entry TTL
//!
//! ttlkv is an in-process, thread-safe map in which every entry carries its
//! own time-to-live. Entries vanish once their TTL elapses unless they are
//! renewed, without the caller having to wire up a cleanup thread.
//!
//! ## Features
//!
//! - **Per-Insertion TTL**: each `put` sets its own lifetime, the latest `put` wins
//! - **Renewal**: `renew_key` and (by default) `get` restart a key's window
//! - **Lazy Expiry**: every operation first drains the tickets that are due
//! - **Concurrent**: sharded `RwLock`s, safe to share behind an `Arc`
//! - **Optional Active Expiry**: a Tokio task can sweep in the background
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            ExpiringStore                                │
//! │                                                                         │
//! │   put / get / renew_key / remove / contains_key / len / keys ...        │
//! │        │                                                                │
//! │        │ 1. sweep()                                                     │
//! │        ▼                                                                │
//! │  ┌─────────────────┐   poll_due()   ┌───────────────────────────────┐  │
//! │  │ ExpirationQueue │ ─────────────> │ evict if ticket still current │  │
//! │  └─────────────────┘                └───────────────────────────────┘  │
//! │        ▲                                                                │
//! │        │ 2. enqueue (put)                                               │
//! │  ┌──────────────────────────────────────────────┐                      │
//! │  │  Shards: ExpiryRegistry + ValueStore (RwLock) │                      │
//! │  └──────────────────────────────────────────────┘                      │
//! │                                               ▲                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │     ExpirySweeper (optional Tokio task)         │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use ttlkv::ExpiringStore;
//! use std::time::Duration;
//!
//! let store = ExpiringStore::new(16, Duration::from_secs(5));
//!
//! store.put("Sameer", "Father");
//! store.put_with_ttl_millis("otp", "493021", 30_000);
//!
//! assert_eq!(store.get("Sameer"), Some("Father"));
//! assert!(store.renew_key("otp"));
//! assert_eq!(store.remove("otp"), Some("493021"));
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: the store, its tickets, queue and background sweeper
//! - [`error`]: the error type for the few operations that can fail
//!
//! ## Design Highlights
//!
//! ### Tickets, not timestamps
//!
//! Each insertion creates an [`ExpirationTicket`](storage::ExpirationTicket).
//! A newer `put` or a `remove` tombstones the old ticket instead of digging
//! it out of the queue; the next sweep discards it.
//!
//! ### Check-then-delete
//!
//! The sweep only evicts a key if the registry still maps it to the exact
//! ticket that came off the queue, so a key renewed or replaced while its
//! old ticket was in flight is never lost.
//!
//! ### Lazy + Active Expiry
//!
//! Keys are expired in two ways:
//! 1. **Lazy**: every operation sweeps first
//! 2. **Active**: an optional background task sweeps on an interval
//!
//! The second reclaims memory for keys that are never accessed again.

pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use error::{Result, StoreError};
pub use storage::{
    start_expiry_sweeper, ExpiringStore, ExpiryConfig, ExpirySweeper, StoreConfig, StoreStats,
};

/// Version of ttlkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
