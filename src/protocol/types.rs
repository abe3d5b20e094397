//! RESP Value Types
//!
//! The subset of the Redis Serialization Protocol spoken by respcache.
//!
//! ## Protocol Format
//!
//! Requests arrive as arrays of strings. Replies use one of four shapes:
//!
//! - Simple String: `+OK\r\n`
//! - Error: `-ERR invalid command: FOO\r\n`
//! - Bulk String: `$5\r\nhello\r\n`
//! - Null Bulk String: `$-1\r\n`
//!
//! A request such as `GET name` is framed as `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`.

use bytes::Bytes;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A decoded request unit or a reply waiting to be encoded.
///
/// Clients only ever send `SimpleString`, `BulkString` and `Array`.
/// `Error` and `Null` exist so the dispatcher can express every reply
/// shape with the same type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Short status text without CR or LF.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Error reply.
    /// Format: `-<message>\r\n`
    Error(String),

    /// Length-prefixed payload.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Absent value, encoded as the null bulk string `$-1\r\n`.
    Null,

    /// Ordered sequence of values, carrying a command and its arguments.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Creates a new simple string reply.
    ///
    /// # Example
    /// ```
    /// use respcache::protocol::RespValue;
    /// assert_eq!(RespValue::simple_string("OK").serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a new error reply. The message is sent verbatim, so callers
    /// include the `ERR` prefix themselves.
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a new bulk string reply.
    ///
    /// # Example
    /// ```
    /// use respcache::protocol::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// Creates a null reply.
    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// `+OK`
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// `+PONG`
    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the value to its wire representation.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            RespValue::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Returns the payload of a simple or bulk string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::SimpleString(s) => Some(s.as_bytes()),
            RespValue::BulkString(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the payload of a simple or bulk string as a cheap `Bytes` handle.
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            RespValue::SimpleString(s) => Some(Bytes::copy_from_slice(s.as_bytes())),
            RespValue::BulkString(b) => Some(b.clone()),
            _ => None,
        }
    }

    /// Attempts to extract the inner array.
    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        let value = RespValue::simple_string("OK");
        assert_eq!(value.serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR invalid command: FOO");
        assert_eq!(value.serialize(), b"-ERR invalid command: FOO\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_bulk_string_length_counts_bytes() {
        // "héllo" is 6 bytes in UTF-8
        let value = RespValue::bulk_string(Bytes::from("héllo"));
        assert_eq!(value.serialize(), "$6\r\nhéllo\r\n".as_bytes());
    }

    #[test]
    fn test_empty_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::new());
        assert_eq!(value.serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::bulk_string(Bytes::from("GET")),
            RespValue::bulk_string(Bytes::from("name")),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
    }

    #[test]
    fn test_canned_replies() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
        assert_eq!(RespValue::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_accessors() {
        let simple = RespValue::simple_string("ping");
        assert_eq!(simple.as_bytes(), Some(&b"ping"[..]));
        assert_eq!(simple.to_bytes(), Some(Bytes::from("ping")));

        let array = RespValue::array(vec![RespValue::null()]);
        assert_eq!(array.as_bytes(), None);
        assert_eq!(array.as_array().map(|a| a.len()), Some(1));
        assert!(array.as_array().unwrap()[0].is_null());
        assert!(RespValue::error("ERR x").is_error());
    }
}
