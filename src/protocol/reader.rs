//! Buffered RESP Reader
//!
//! TCP is a byte stream: one read may deliver half a request, or three
//! requests at once. `RespReader` owns the read buffer for a connection and
//! hands out one complete value per call. Bytes belonging to the next request
//! stay in the buffer, so the reader must be created once per connection and
//! reused for every request on it. The parser it holds keeps its place
//! between reads, so a large value arriving in many small reads is scanned
//! once rather than from the start after every read.

use crate::protocol::parser::{ParseError, RespParser, MAX_BULK_SIZE};
use crate::protocol::types::RespValue;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Largest amount of unparsed data we are willing to hold for one request.
pub const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

/// Errors produced while reading a request from the stream.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RESP data
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The stream ended in the middle of a request
    #[error("stream ended with {buffered} bytes of an incomplete request")]
    UnexpectedEof { buffered: usize },

    /// Buffered data exceeded [`MAX_BUFFER_SIZE`] without forming a request
    #[error("request exceeds {max} bytes")]
    FrameTooLarge { max: usize },
}

/// Reads RESP values from an async byte source.
///
/// # Example
///
/// ```
/// use respcache::protocol::{RespReader, RespValue};
///
/// # tokio_test::block_on(async {
/// let mut reader = RespReader::new(&b"+PING\r\n"[..]);
/// assert_eq!(
///     reader.read_value().await.unwrap(),
///     Some(RespValue::simple_string("PING"))
/// );
/// assert_eq!(reader.read_value().await.unwrap(), None);
/// # });
/// ```
#[derive(Debug)]
pub struct RespReader<R> {
    inner: R,
    buffer: BytesMut,
    parser: RespParser,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> RespReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: RespParser::new(),
            bytes_read: 0,
        }
    }

    /// Reads the next complete value.
    ///
    /// Returns `Ok(None)` when the peer closed the stream between requests.
    /// A close in the middle of a request is [`ReadError::UnexpectedEof`].
    pub async fn read_value(&mut self) -> Result<Option<RespValue>, ReadError> {
        loop {
            if let Some((value, consumed)) = self.parser.parse(&self.buffer)? {
                self.buffer.advance(consumed);
                trace!(
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed value"
                );
                return Ok(Some(value));
            }

            if self.buffer.len() >= MAX_BUFFER_SIZE {
                return Err(ReadError::FrameTooLarge {
                    max: MAX_BUFFER_SIZE,
                });
            }

            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(INITIAL_BUFFER_SIZE);
            }

            let n = self.inner.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ReadError::UnexpectedEof {
                    buffered: self.buffer.len(),
                });
            }

            self.bytes_read += n as u64;
            trace!(bytes = n, "Read data");
        }
    }

    /// Total bytes pulled from the underlying stream so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes received but not yet consumed by a complete value.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
