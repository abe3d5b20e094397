//! # respcache - A Small In-Memory Cache Speaking RESP
//!
//! respcache is an in-memory key-value cache exposed over the Redis wire
//! protocol. Any Redis client can talk to it using `PING`, `ECHO`, `GET` and
//! `SET` (with an optional `PX` expiry in milliseconds).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              respcache                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌─────────────────────────────┐  │
//! │                     │ RespReader  │    │            Cache            │  │
//! │                     │ + Parser    │    │  sharded RwLock<HashMap>    │  │
//! │                     └─────────────┘    └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use respcache::commands::CommandHandler;
//! use respcache::connection::{handle_connection, ConnectionStats};
//! use respcache::storage::Cache;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Arc::new(Cache::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(&cache));
//!         tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP values, parser and per-connection reader
//! - [`storage`]: Thread-safe expiring cache
//! - [`commands`]: Command dispatch
//! - [`connection`]: Client connection loop
//! - [`config`]: Command-line configuration
//!
//! ## Expiry
//!
//! Expiry is lazy. A key whose deadline has passed stays in memory until a
//! `GET` finds it stale and removes it, or a `SET` overwrites it.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use config::{CliAction, Config, ConfigError};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, ReadError, RespParser, RespReader, RespValue};
pub use storage::{Cache, Lookup};

/// The default port respcache listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host respcache binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of respcache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
