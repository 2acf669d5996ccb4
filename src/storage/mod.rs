//! Storage Module
//!
//! This module provides the expiring store and the pieces it is built from:
//! per-insertion expiration tickets, the time-ordered queue they wait in,
//! and an optional background sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ExpiringStore                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! │                 ExpirationQueue (tickets)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ sweep()
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (optional Tokio task)    │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Per-entry TTL**: every `put` carries its own time-to-live
//! - **Sliding TTL**: reads and `renew_key` restart the window
//! - **Lazy Expiry**: every operation sweeps due tickets first
//! - **Active Expiry**: the sweeper reclaims keys nobody touches
//!
//! ## Example
//!
//! ```
//! use ttlkv::storage::ExpiringStore;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let store = ExpiringStore::new(64, Duration::from_secs(60));
//!
//! store.put(Bytes::from("name"), Bytes::from("Huzaif"));
//! assert_eq!(store.get(&Bytes::from("name")), Some(Bytes::from("Huzaif")));
//!
//! store.put_with_ttl(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Duration::from_secs(3600),
//! );
//! assert!(store.renew_key(&Bytes::from("session")));
//! ```

pub mod config;
pub mod engine;
pub mod expiry;
pub mod queue;
pub mod ticket;

// Re-export commonly used types
pub use config::StoreConfig;
pub use engine::{ExpiringStore, StoreStats};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper};
pub use queue::ExpirationQueue;
pub use ticket::ExpirationTicket;
