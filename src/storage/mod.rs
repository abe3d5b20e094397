//! Storage Module
//!
//! The thread-safe expiring cache shared by every client connection.
//!
//! ## Features
//!
//! - **Sharded Storage**: independent `RwLock`-protected shards
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **TTL Support**: Entries may carry an absolute expiry deadline
//! - **Lazy Expiry**: Expired entries are reported on read and reaped by the caller
//!
//! ## Example
//!
//! ```
//! use respcache::storage::{Cache, Lookup};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let cache = Cache::new();
//! cache.set(Bytes::from("token"), Bytes::from("123"), Some(Duration::ZERO));
//!
//! if cache.get(b"token") == Lookup::Expired {
//!     cache.remove_expired(b"token");
//! }
//! assert!(cache.is_empty());
//! ```

pub mod engine;

pub use engine::{Cache, CacheStats, Entry, Lookup};
