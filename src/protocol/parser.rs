//! Incremental RESP Request Parser
//!
//! The parser works on whatever bytes have been buffered so far and returns
//! one of:
//! - `Ok(Some((value, consumed)))` - a complete value, `consumed` bytes were used
//! - `Ok(None)` - the value is not complete yet, read more and try again
//! - `Err(ParseError)` - the input is malformed
//!
//! Nothing is consumed until a whole value is available, so a caller that keeps
//! one buffer for the life of a connection can feed pipelined requests through
//! without losing bytes between them.
//!
//! The parser remembers where it stopped. After `Ok(None)` the next call must
//! pass the same bytes with more appended, and parsing resumes at the piece
//! that was incomplete, so every byte is examined once however the request is
//! split across reads.
//!
//! Only the request-side markers (`+`, `$`, `*`) are accepted. Bulk string
//! bodies are CRLF-terminated and must match their declared length exactly;
//! a declared length that disagrees with the body is a protocol violation.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("invalid first byte (data type): {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer format in a length or count line
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a simple string or a length line
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Bulk string body does not end where its length line said it would
    #[error("bulk string body does not match declared length {declared}")]
    BulkLengthMismatch { declared: usize },

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation not covered above
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The message exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// Upper bound on the capacity reserved up front for an array, whatever
/// count the client declares.
const MAX_PREALLOC_ELEMENTS: usize = 1024;

/// What the parser expects next.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    /// A type marker byte
    #[default]
    Marker,
    /// The text of a simple string
    SimpleLine,
    /// The length line of a bulk string
    BulkLength,
    /// The element count of an array
    ArrayLength,
    /// A bulk string body of the given declared length
    BulkBody { len: usize },
}

/// An array whose elements are still arriving.
#[derive(Debug)]
struct PartialArray {
    remaining: usize,
    elements: Vec<RespValue>,
}

/// A resumable RESP parser.
///
/// # Example
///
/// ```
/// use respcache::protocol::{RespParser, RespValue};
/// use bytes::Bytes;
///
/// let mut parser = RespParser::new();
/// let request = b"*1\r\n$4\r\nPING\r\n";
///
/// assert!(parser.parse(&request[..6]).unwrap().is_none());
/// let (value, consumed) = parser.parse(request).unwrap().unwrap();
/// assert_eq!(value, RespValue::Array(vec![RespValue::BulkString(Bytes::from("PING"))]));
/// assert_eq!(consumed, 14);
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    state: State,
    /// Offset of the first byte not yet consumed by a completed piece
    pos: usize,
    /// Offset where the pending CRLF search resumes
    scanned: usize,
    /// Enclosing arrays, innermost last
    stack: Vec<PartialArray>,
}

impl RespParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to parse one RESP value from the front of `buf`.
    ///
    /// After `Ok(None)`, call again with the same buffer extended by newly
    /// received bytes. A completed value or an error resets the parser for
    /// the next request.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        match self.advance(buf) {
            Ok(Some(value)) => {
                let consumed = self.pos;
                self.reset();
                Ok(Some((value, consumed)))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    /// Discards any partially parsed request.
    pub fn reset(&mut self) {
        self.state = State::Marker;
        self.pos = 0;
        self.scanned = 0;
        self.stack.clear();
    }

    fn advance(&mut self, buf: &[u8]) -> ParseResult<Option<RespValue>> {
        loop {
            let value = match self.state {
                State::Marker => {
                    let Some(&marker) = buf.get(self.pos) else {
                        return Ok(None);
                    };
                    self.state = match marker {
                        prefix::SIMPLE_STRING => State::SimpleLine,
                        prefix::BULK_STRING => State::BulkLength,
                        prefix::ARRAY => State::ArrayLength,
                        other => return Err(ParseError::UnknownPrefix(other)),
                    };
                    self.pos += 1;
                    self.scanned = self.pos;
                    continue;
                }
                State::SimpleLine => {
                    let Some(line) = self.take_line(buf) else {
                        return Ok(None);
                    };
                    let s = std::str::from_utf8(line)
                        .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
                    RespValue::SimpleString(s.to_string())
                }
                State::BulkLength => {
                    let Some(line) = self.take_line(buf) else {
                        return Ok(None);
                    };
                    let length = parse_integer(line)?;
                    if length < 0 {
                        return Err(ParseError::InvalidBulkLength(length));
                    }
                    let len = length as usize;
                    if len > MAX_BULK_SIZE {
                        return Err(ParseError::MessageTooLarge {
                            size: len,
                            max: MAX_BULK_SIZE,
                        });
                    }
                    self.state = State::BulkBody { len };
                    self.scanned = self.pos;
                    continue;
                }
                State::ArrayLength => {
                    let Some(line) = self.take_line(buf) else {
                        return Ok(None);
                    };
                    let count = parse_integer(line)?;
                    match count {
                        -1 => RespValue::Null,
                        c if c < 0 => return Err(ParseError::InvalidArrayLength(c)),
                        0 => RespValue::Array(Vec::new()),
                        c => {
                            if self.stack.len() >= MAX_NESTING_DEPTH {
                                return Err(ParseError::ProtocolError(format!(
                                    "maximum nesting depth exceeded: {}",
                                    MAX_NESTING_DEPTH
                                )));
                            }
                            let count = c as usize;
                            self.stack.push(PartialArray {
                                remaining: count,
                                elements: Vec::with_capacity(count.min(MAX_PREALLOC_ELEMENTS)),
                            });
                            self.state = State::Marker;
                            continue;
                        }
                    }
                }
                State::BulkBody { len } => match self.take_body(buf, len)? {
                    Some(data) => RespValue::BulkString(data),
                    None => return Ok(None),
                },
            };

            self.state = State::Marker;
            if let Some(done) = self.complete(value) {
                return Ok(Some(done));
            }
        }
    }

    /// Returns the line starting at `pos` once its CRLF has arrived.
    /// Bytes before `scanned` are never searched again.
    fn take_line<'a>(&mut self, buf: &'a [u8]) -> Option<&'a [u8]> {
        match find_crlf(&buf[self.scanned..]) {
            Some(at) => {
                let end = self.scanned + at;
                let line = &buf[self.pos..end];
                self.pos = end + CRLF.len();
                Some(line)
            }
            None => {
                // The last byte may be a `\r` whose `\n` has not arrived yet
                self.scanned = buf.len().saturating_sub(1).max(self.pos);
                None
            }
        }
    }

    /// Returns a bulk body of `len` bytes starting at `pos`.
    ///
    /// Only the first `len + 2` body bytes are ever searched, and each of them
    /// once, so a terminator in the wrong place is reported as soon as it shows
    /// up rather than after the whole declared length has been received.
    fn take_body(&mut self, buf: &[u8], len: usize) -> ParseResult<Option<Bytes>> {
        let body_start = self.pos;
        let available = buf.len() - body_start;
        let window_end = body_start + available.min(len + CRLF.len());

        match find_crlf(&buf[self.scanned..window_end]) {
            Some(at) if self.scanned + at - body_start == len => {
                self.pos = body_start + len + CRLF.len();
                Ok(Some(Bytes::copy_from_slice(&buf[body_start..body_start + len])))
            }
            Some(_) => Err(ParseError::BulkLengthMismatch { declared: len }),
            None if available >= len + CRLF.len() => {
                Err(ParseError::BulkLengthMismatch { declared: len })
            }
            None => {
                self.scanned = window_end.saturating_sub(1).max(body_start);
                Ok(None)
            }
        }
    }

    /// Attaches a finished value to the innermost open array, closing every
    /// array that becomes full. Returns the top-level value once it is done.
    fn complete(&mut self, mut value: RespValue) -> Option<RespValue> {
        loop {
            let Some(mut top) = self.stack.pop() else {
                return Some(value);
            };
            top.elements.push(value);
            top.remaining -= 1;
            if top.remaining > 0 {
                self.stack.push(top);
                return None;
            }
            value = RespValue::Array(top.elements);
        }
    }
}

/// Parses the decimal text of a length or count line.
fn parse_integer(line: &[u8]) -> ParseResult<i64> {
    let text =
        std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    text.parse()
        .map_err(|e: ParseIntError| ParseError::InvalidInteger(format!("{:?}: {}", text, e)))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
/// A lone `\n` is treated as ordinary content.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single RESP message from bytes.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}
