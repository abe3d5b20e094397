//! Command Handler Module
//!
//! Turns one decoded request into one reply.
//!
//! ## Supported Commands
//!
//! - `PING` - Replies `PONG`, arguments are ignored
//! - `ECHO message` - Replies with `message`
//! - `GET key` - Replies with the value, or null if missing or expired
//! - `SET key value [PX milliseconds]` - Stores a value, optionally with a TTL
//!
//! Command names are case-insensitive. Every handler checks its argument count
//! before touching any argument, and every failure becomes an `-ERR` reply so
//! the connection stays usable.

use crate::protocol::RespValue;
use crate::storage::{Cache, Lookup};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Executes requests against a shared [`Cache`].
#[derive(Clone)]
pub struct CommandHandler {
    storage: Arc<Cache>,
}

impl CommandHandler {
    pub fn new(storage: Arc<Cache>) -> Self {
        Self { storage }
    }

    /// Executes a command and returns the response.
    ///
    /// # Arguments
    ///
    /// * `command` - The decoded request, expected to be an array whose first
    ///   element names the command
    pub fn execute(&self, command: RespValue) -> RespValue {
        let args = match command {
            RespValue::Array(args) => args,
            _ => return RespValue::error("ERR invalid command format"),
        };

        let (name, args) = match args.split_first() {
            Some(split) => split,
            None => return RespValue::error("ERR empty command"),
        };

        let cmd_name = match name.as_bytes().map(String::from_utf8_lossy) {
            Some(name) => name.into_owned(),
            None => return RespValue::error("ERR invalid command name"),
        };

        self.dispatch(&cmd_name, args)
    }

    fn dispatch(&self, cmd: &str, args: &[RespValue]) -> RespValue {
        match cmd.to_ascii_uppercase().as_str() {
            "PING" => self.cmd_ping(args),
            "ECHO" => self.cmd_echo(args),
            "GET" => self.cmd_get(args),
            "SET" => self.cmd_set(args),
            _ => {
                debug!(command = %cmd, "Unknown command");
                RespValue::error(format!("ERR invalid command: {}", single_line(cmd)))
            }
        }
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    fn wrong_arity(cmd: &str) -> RespValue {
        RespValue::error(format!(
            "ERR wrong number of arguments for '{}' command",
            cmd
        ))
    }

    /// Renders an argument for an error message.
    fn display_arg(value: &RespValue) -> String {
        value
            .as_bytes()
            .map(|b| single_line(&String::from_utf8_lossy(b)))
            .unwrap_or_default()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// PING
    fn cmd_ping(&self, _args: &[RespValue]) -> RespValue {
        RespValue::pong()
    }

    /// ECHO message
    fn cmd_echo(&self, args: &[RespValue]) -> RespValue {
        let Some(message) = args.first() else {
            return Self::wrong_arity("echo");
        };

        match message.to_bytes() {
            Some(msg) => RespValue::bulk_string(msg),
            None => RespValue::error("ERR invalid argument"),
        }
    }

    /// GET key
    fn cmd_get(&self, args: &[RespValue]) -> RespValue {
        let Some(key) = args.first() else {
            return Self::wrong_arity("get");
        };

        let key = match key.to_bytes() {
            Some(k) => k,
            None => return RespValue::error("ERR invalid argument"),
        };

        match self.storage.get(&key) {
            Lookup::Found(value) => RespValue::bulk_string(value),
            Lookup::Expired => {
                if self.storage.remove_expired(&key) {
                    debug!(key = %String::from_utf8_lossy(&key), "Reaped expired key");
                }
                RespValue::null()
            }
            Lookup::NotFound => RespValue::null(),
        }
    }

    /// SET key value [PX milliseconds]
    fn cmd_set(&self, args: &[RespValue]) -> RespValue {
        let ttl = match args {
            [_, _] => None,
            [_, _, unit, amount] => match Self::parse_px(unit, amount) {
                Ok(ttl) => Some(ttl),
                Err(reply) => return reply,
            },
            _ => return Self::wrong_arity("set"),
        };

        let (key, value) = match (args[0].to_bytes(), args[1].to_bytes()) {
            (Some(k), Some(v)) => (k, v),
            _ => return RespValue::error("ERR invalid argument"),
        };

        self.storage.set(key, value, ttl);
        RespValue::ok()
    }

    /// Validates the `PX milliseconds` tail of a SET.
    fn parse_px(unit: &RespValue, amount: &RespValue) -> Result<Duration, RespValue> {
        let is_px = unit
            .as_bytes()
            .is_some_and(|b| b.eq_ignore_ascii_case(b"PX"));
        if !is_px {
            return Err(RespValue::error(format!(
                "ERR invalid SET argument: {}",
                Self::display_arg(unit)
            )));
        }

        let ms = amount
            .as_bytes()
            .and_then(|b| std::str::from_utf8(b).ok())
            .and_then(|s| s.parse::<u64>().ok());
        match ms {
            Some(ms) => Ok(Duration::from_millis(ms)),
            None => Err(RespValue::error(format!(
                "ERR invalid expiration time: {}",
                Self::display_arg(amount)
            ))),
        }
    }
}

/// Replaces line breaks so client text quoted in an `-ERR` reply cannot end
/// the reply line early.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn create_handler() -> (CommandHandler, Arc<Cache>) {
        let storage = Arc::new(Cache::new());
        (CommandHandler::new(Arc::clone(&storage)), storage)
    }

    fn make_command(args: &[&str]) -> RespValue {
        RespValue::Array(
            args.iter()
                .map(|s| RespValue::bulk_string(Bytes::from(s.to_string())))
                .collect(),
        )
    }

    #[test]
    fn test_ping() {
        let (handler, _) = create_handler();

        let response = handler.execute(make_command(&["PING"]));
        assert_eq!(response, RespValue::simple_string("PONG"));

        // Arguments are ignored
        let response = handler.execute(make_command(&["ping", "hello"]));
        assert_eq!(response, RespValue::pong());
    }

    #[test]
    fn test_simple_string_command_name() {
        let (handler, _) = create_handler();

        let command = RespValue::Array(vec![RespValue::simple_string("PING")]);
        assert_eq!(handler.execute(command), RespValue::pong());
    }

    #[test]
    fn test_echo() {
        let (handler, _) = create_handler();

        let response = handler.execute(make_command(&["ECHO", "hello world"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("hello world")));
    }

    #[test]
    fn test_echo_missing_argument() {
        let (handler, _) = create_handler();

        let response = handler.execute(make_command(&["echo"]));
        assert_eq!(
            response,
            RespValue::error("ERR wrong number of arguments for 'echo' command")
        );
    }

    #[test]
    fn test_set_get() {
        let (handler, _) = create_handler();

        let response = handler.execute(make_command(&["SET", "key", "value"]));
        assert_eq!(response, RespValue::ok());

        let response = handler.execute(make_command(&["get", "key"]));
        assert_eq!(response, RespValue::bulk_string(Bytes::from("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let (handler, _) = create_handler();

        let response = handler.execute(make_command(&["GET", "nonexistent"]));
        assert_eq!(response, RespValue::null());
        assert_eq!(response.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_get_missing_key_argument() {
        let (handler, _) = create_handler();

        let response = handler.execute(make_command(&["GET"]));
        assert_eq!(
            response,
            RespValue::error("ERR wrong number of arguments for 'get' command")
        );
    }

    #[test]
    fn test_set_with_px_expires_and_reaps() {
        let (handler, storage) = create_handler();

        let response = handler.execute(make_command(&["SET", "k", "v", "px", "10"]));
        assert_eq!(response, RespValue::ok());
        assert_eq!(
            handler.execute(make_command(&["GET", "k"])),
            RespValue::bulk_string(Bytes::from("v"))
        );

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(storage.get(b"k"), Lookup::Expired);

        let response = handler.execute(make_command(&["GET", "k"]));
        assert_eq!(response, RespValue::null());

        // The GET physically removed the stale entry
        assert_eq!(storage.get(b"k"), Lookup::NotFound);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_set_invalid_px_token() {
        let (handler, storage) = create_handler();

        let response = handler.execute(make_command(&["SET", "k", "v", "EX", "10"]));
        assert_eq!(response, RespValue::error("ERR invalid SET argument: EX"));

        // Validation failures do not store anything
        assert_eq!(storage.get(b"k"), Lookup::NotFound);
    }

    #[test]
    fn test_set_invalid_expiration_time() {
        let (handler, storage) = create_handler();

        for bad in ["soon", "-5", "1.5", ""] {
            let response = handler.execute(make_command(&["SET", "k", "v", "PX", bad]));
            assert_eq!(
                response,
                RespValue::error(format!("ERR invalid expiration time: {}", bad))
            );
        }
        assert!(storage.is_empty());
    }

    #[test]
    fn test_set_unsupported_argument_counts() {
        let (handler, storage) = create_handler();

        let commands: [&[&str]; 4] = [
            &["SET"],
            &["SET", "k"],
            &["SET", "k", "v", "PX"],
            &["SET", "k", "v", "PX", "10", "extra"],
        ];
        for command in commands {
            assert_eq!(
                handler.execute(make_command(command)),
                RespValue::error("ERR wrong number of arguments for 'set' command")
            );
        }
        assert!(storage.is_empty());
    }

    #[test]
    fn test_set_overwrites_expiry() {
        let (handler, _) = create_handler();

        handler.execute(make_command(&["SET", "k", "old", "PX", "5"]));
        handler.execute(make_command(&["SET", "k", "new"]));
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(
            handler.execute(make_command(&["GET", "k"])),
            RespValue::bulk_string(Bytes::from("new"))
        );
    }

    #[test]
    fn test_unknown_command() {
        let (handler, _) = create_handler();

        let response = handler.execute(make_command(&["FlushAll"]));
        assert_eq!(response, RespValue::error("ERR invalid command: FlushAll"));
    }

    #[test]
    fn test_malformed_requests() {
        let (handler, _) = create_handler();

        assert_eq!(
            handler.execute(RespValue::simple_string("PING")),
            RespValue::error("ERR invalid command format")
        );
        assert_eq!(
            handler.execute(RespValue::Null),
            RespValue::error("ERR invalid command format")
        );
        assert_eq!(
            handler.execute(RespValue::array(vec![])),
            RespValue::error("ERR empty command")
        );
        assert_eq!(
            handler.execute(RespValue::array(vec![RespValue::array(vec![])])),
            RespValue::error("ERR invalid command name")
        );
    }

    #[test]
    fn test_non_string_argument() {
        let (handler, storage) = create_handler();

        let command = RespValue::array(vec![
            RespValue::bulk_string(Bytes::from("SET")),
            RespValue::array(vec![]),
            RespValue::bulk_string(Bytes::from("v")),
        ]);
        assert_eq!(
            handler.execute(command),
            RespValue::error("ERR invalid argument")
        );
        assert!(storage.is_empty());
    }

    #[test]
    fn test_error_replies_quote_client_text_on_one_line() {
        let (handler, storage) = create_handler();

        assert_eq!(
            handler.execute(make_command(&["FLUSH\r\nALL"])),
            RespValue::error("ERR invalid command: FLUSH  ALL")
        );
        assert_eq!(
            handler.execute(make_command(&["SET", "k", "v", "P\nX", "10"])),
            RespValue::error("ERR invalid SET argument: P X")
        );
        assert_eq!(
            handler.execute(make_command(&["SET", "k", "v", "PX", "1\r0"])),
            RespValue::error("ERR invalid expiration time: 1 0")
        );
        assert!(storage.is_empty());

        // The encoded reply is a single line
        let encoded = handler.execute(make_command(&["a\nb"])).serialize();
        assert_eq!(&encoded[..], b"-ERR invalid command: a b\r\n");
    }
}
