//! Connection Handler Module
//!
//! Manages individual client connections. Each accepted socket is handled by
//! its own Tokio task; tasks share nothing except the [`Cache`](crate::storage::Cache)
//! behind their [`CommandHandler`](crate::commands::CommandHandler).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept() + spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ RespReader  │───>│ Execute cmd │───>│ Send reply  │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use respcache::connection::{handle_connection, ConnectionStats};
//! use respcache::commands::CommandHandler;
//! use respcache::storage::Cache;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(Cache::new());
//! let stats = Arc::new(ConnectionStats::new());
//!
//! let (stream, addr) = listener.accept().await?;
//! let handler = CommandHandler::new(Arc::clone(&cache));
//! tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
