//! Connection Handler Module
//!
//! Each client gets its own task running a strictly sequential loop:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  read one request (RESP)     │◀─┐
//! │  execute against the cache   │  │
//! │  write + flush the reply     │──┘
//! └──────────────────────────────┘
//! ```
//!
//! The loop ends quietly when the client closes the stream between requests.
//! Malformed input or a close in the middle of a request also ends it, without
//! a reply: RESP framing cannot be resynchronized once it is lost.
//!
//! The socket's read half is wrapped in a single [`RespReader`] for the whole
//! connection, so pipelined requests that arrive in one packet are answered in
//! order.

use crate::commands::CommandHandler;
use crate::protocol::{ReadError, RespReader, RespValue};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: u64) {
        self.bytes_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The request could not be read
    #[error("read error: {0}")]
    Read(#[from] ReadError),

    /// The reply could not be written
    #[error("write error: {0}")]
    Write(#[from] std::io::Error),
}

impl ConnectionError {
    fn is_connection_reset(&self) -> bool {
        let io_err = match self {
            ConnectionError::Read(ReadError::Io(e)) | ConnectionError::Write(e) => e,
            _ => return false,
        };
        matches!(
            io_err.kind(),
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
        )
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    /// Request reader, created once and reused for every request
    reader: RespReader<OwnedReadHalf>,

    /// Buffered reply writer
    writer: BufWriter<OwnedWriteHalf>,

    /// Client's address (for logging)
    addr: SocketAddr,

    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Portion of `reader.bytes_read()` already added to `stats`
    reported_read: u64,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The TCP stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        let (read_half, write_half) = stream.into_split();

        Self {
            reader: RespReader::new(read_half),
            writer: BufWriter::new(write_half),
            addr,
            command_handler,
            stats,
            reported_read: 0,
        }
    }

    /// Runs the connection loop until the client leaves or misbehaves.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;
        self.report_bytes_read();

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(e) if e.is_connection_reset() => {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Closing connection"),
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        while let Some(command) = self.reader.read_value().await? {
            self.report_bytes_read();

            let response = self.command_handler.execute(command);
            self.stats.command_processed();

            self.send_response(&response).await?;
        }

        Ok(())
    }

    fn report_bytes_read(&mut self) {
        let total = self.reader.bytes_read();
        self.stats.bytes_read(total - self.reported_read);
        self.reported_read = total;
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Handles a client connection.
///
/// Creates a [`ConnectionHandler`] and runs it to completion. Errors have
/// already been logged by the handler, so they are dropped here.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    let _ = handler.run().await;
}
