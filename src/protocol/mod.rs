//! RESP Protocol Implementation
//!
//! This module provides the subset of the Redis Serialization Protocol (RESP)
//! that respcache speaks.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` enum and reply serialization
//! - `parser`: Incremental parser for incoming requests
//! - `reader`: Per-connection buffered reader built on the parser
//!
//! ## Example
//!
//! ```
//! use respcache::protocol::{parse_message, RespValue};
//! use bytes::Bytes;
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//! assert!(value.as_array().is_some());
//!
//! let response = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(response.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod reader;
pub mod types;

pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use reader::{ReadError, RespReader};
pub use types::RespValue;
