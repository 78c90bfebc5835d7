//! Command model for the adapters.
//!
//! Commands arrive either as text (`write 200`, `o /dev/parport3`) or as JSON
//! objects (`{"command": "write", "params": {"value": 200}}`). Only the first
//! letter of the verb is significant, matching the abbreviations `o`, `w`,
//! `r`, `c`. Argument-count and range violations are usage errors.

use crate::error::{DeviceError, DeviceResult};
use crate::manager::{ManagerStatus, PortManager};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Usage summary printed by `help`.
pub const HELP_TEXT: &str = "\
parport usage:
  open [address]   open and claim the default ports, or only `address` (single-port mode)
  write <0-255>    drive the value onto the data lines of the write port
  read             read the status lines of every open port (one value per port)
  close            release and close all ports, restoring the defaults
  status           show the slot table
  help             show this message
  exit             close everything and quit
Commands may be abbreviated to their first letter.";

/// A request to the port manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open { address: Option<String> },
    Write { value: u8 },
    Read,
    Close,
    Status,
    Help,
    Exit,
}

/// The result of a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The command had no output.
    Done,
    /// Status-line values, in slot order.
    Values(Vec<u8>),
    Status(ManagerStatus),
    Help,
    Exit,
}

/// Convert a caller-supplied integer into a data-line byte.
pub fn parse_byte(value: i64) -> DeviceResult<u8> {
    u8::try_from(value).map_err(|_| {
        DeviceError::invalid_argument(format!("value {value} is outside the range 0..=255"))
    })
}

fn verb(word: &str) -> DeviceResult<char> {
    word.chars()
        .next()
        .map(|c| c.to_ascii_lowercase())
        .ok_or_else(|| DeviceError::invalid_argument("no command given"))
}

fn expect_no_args(name: &str, args: usize) -> DeviceResult<()> {
    if args != 0 {
        return Err(DeviceError::invalid_argument(format!(
            "{name} takes no argument"
        )));
    }
    Ok(())
}

fn expect_only_params(
    name: &str,
    params: &Map<String, Value>,
    allowed: &[&str],
) -> DeviceResult<()> {
    match params.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(DeviceError::invalid_argument(format!(
            "{name} does not take '{key}'"
        ))),
        None => Ok(()),
    }
}

impl Command {
    /// Parse one input line, either text or a JSON object.
    pub fn parse(line: &str) -> DeviceResult<Self> {
        let line = line.trim();
        if line.starts_with('{') {
            Self::parse_json(line)
        } else {
            Self::parse_text(line)
        }
    }

    /// Parse the text form: a verb followed by whitespace-separated arguments.
    pub fn parse_text(line: &str) -> DeviceResult<Self> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match verb(name)? {
            'o' => match args.as_slice() {
                [] => Ok(Self::Open { address: None }),
                [address] => Ok(Self::Open {
                    address: Some((*address).to_string()),
                }),
                _ => Err(DeviceError::invalid_argument(
                    "open takes at most one address",
                )),
            },
            'w' => match args.as_slice() {
                [value] => {
                    let value: i64 = value.parse().map_err(|_| {
                        DeviceError::invalid_argument(format!(
                            "'{value}' is not an integer in 0..=255"
                        ))
                    })?;
                    Ok(Self::Write {
                        value: parse_byte(value)?,
                    })
                }
                _ => Err(DeviceError::invalid_argument(
                    "write needs exactly one value in 0..=255",
                )),
            },
            'r' => expect_no_args("read", args.len()).map(|_| Self::Read),
            'c' => expect_no_args("close", args.len()).map(|_| Self::Close),
            's' => expect_no_args("status", args.len()).map(|_| Self::Status),
            'h' | '?' => expect_no_args("help", args.len()).map(|_| Self::Help),
            'e' | 'q' => expect_no_args("exit", args.len()).map(|_| Self::Exit),
            _ => Err(DeviceError::invalid_argument(format!(
                "unknown command '{name}': expected open / write / read / close"
            ))),
        }
    }

    /// Parse the JSON form: `{"command": "...", "params": {...}}`.
    pub fn parse_json(line: &str) -> DeviceResult<Self> {
        #[derive(Deserialize)]
        struct Request {
            command: String,
            #[serde(default)]
            params: Value,
        }

        let request: Request = serde_json::from_str(line)
            .map_err(|e| DeviceError::invalid_argument(format!("malformed request: {e}")))?;
        let params = match request.params {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => return Err(DeviceError::invalid_argument("params must be an object")),
        };

        match verb(&request.command)? {
            'o' => {
                expect_only_params("open", &params, &["address"])?;
                match params.get("address") {
                    None | Some(Value::Null) => Ok(Self::Open { address: None }),
                    Some(Value::String(address)) => Ok(Self::Open {
                        address: Some(address.clone()),
                    }),
                    Some(_) => Err(DeviceError::invalid_argument("address must be a string")),
                }
            }
            'w' => {
                expect_only_params("write", &params, &["value"])?;
                let value = params
                    .get("value")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        DeviceError::invalid_argument("write needs an integer 'value' in 0..=255")
                    })?;
                Ok(Self::Write {
                    value: parse_byte(value)?,
                })
            }
            'r' => expect_no_args("read", params.len()).map(|_| Self::Read),
            'c' => expect_no_args("close", params.len()).map(|_| Self::Close),
            's' => expect_no_args("status", params.len()).map(|_| Self::Status),
            'h' | '?' => expect_no_args("help", params.len()).map(|_| Self::Help),
            'e' | 'q' => expect_no_args("exit", params.len()).map(|_| Self::Exit),
            _ => Err(DeviceError::invalid_argument(format!(
                "unknown command '{}'",
                request.command
            ))),
        }
    }

    /// Run this command against `manager`.
    pub fn execute(self, manager: &mut PortManager) -> DeviceResult<Outcome> {
        match self {
            Self::Open { address } => manager.open(address.as_deref()).map(|_| Outcome::Done),
            Self::Write { value } => manager.write(value).map(|_| Outcome::Done),
            Self::Read => manager.read().map(Outcome::Values),
            Self::Close => manager.close().map(|_| Outcome::Done),
            Self::Status => Ok(Outcome::Status(manager.status())),
            Self::Help => Ok(Outcome::Help),
            Self::Exit => Ok(Outcome::Exit),
        }
    }
}

impl Outcome {
    /// Plain-text rendering, or `None` when there is nothing to print.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Done | Self::Exit => None,
            Self::Values(values) => Some(
                values
                    .iter()
                    .map(u8::to_string)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Self::Status(status) => {
                let mut out = format!("mode: {}, write port: slot {}", status.mode, status.write_target);
                for slot in &status.slots {
                    let state = if slot.open { "open" } else { "closed" };
                    out.push_str(&format!("\n  slot {}: {} ({state})", slot.index, slot.address));
                }
                Some(out)
            }
            Self::Help => Some(HELP_TEXT.to_string()),
        }
    }

    /// JSON rendering in the `{"status": "ok", ...}` envelope.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Done => json!({ "status": "ok" }),
            Self::Exit => json!({ "status": "ok", "message": "bye" }),
            Self::Values(values) => json!({ "status": "ok", "values": values }),
            Self::Status(status) => json!({ "status": "ok", "state": status }),
            Self::Help => json!({
                "status": "ok",
                "commands": ["open", "write", "read", "close", "status", "help", "exit"],
                "usage": HELP_TEXT,
            }),
        }
    }
}

/// JSON rendering of an error in the `{"status": "error", ...}` envelope.
pub fn error_json(err: &DeviceError) -> Value {
    json!({
        "status": "error",
        "error": {
            "type": err.kind(),
            "message": err.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_first_letter_dispatch() {
        assert_eq!(Command::parse("o").unwrap(), Command::Open { address: None });
        assert_eq!(Command::parse("OPEN").unwrap(), Command::Open { address: None });
        assert_eq!(
            Command::parse("open /dev/parport3").unwrap(),
            Command::Open {
                address: Some("/dev/parport3".to_string())
            }
        );
        assert_eq!(Command::parse("w 200").unwrap(), Command::Write { value: 200 });
        assert_eq!(Command::parse("Read").unwrap(), Command::Read);
        assert_eq!(Command::parse("c").unwrap(), Command::Close);
        assert_eq!(Command::parse("status").unwrap(), Command::Status);
        assert_eq!(Command::parse("exit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_argument_count_errors() {
        for line in ["write", "write 1 2", "read 1", "close now", "open a b", ""] {
            let err = Command::parse(line).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UsageError, "line: {line:?}");
        }
    }

    #[test]
    fn test_text_and_json_agree_on_arguments() {
        let cases = [
            ("open a b", r#"{"command": "open", "params": {"address": "a", "port": 2}}"#),
            ("status x", r#"{"command": "status", "params": {"verbose": true}}"#),
            ("write 1 2", r#"{"command": "write", "params": {"value": 1, "extra": 2}}"#),
            ("help me", r#"{"command": "help", "params": {"topic": "write"}}"#),
            ("exit now", r#"{"command": "exit", "params": {"code": 0}}"#),
        ];
        for (text, json) in cases {
            assert!(Command::parse(text).unwrap_err().is_usage(), "line: {text:?}");
            assert!(Command::parse(json).unwrap_err().is_usage(), "line: {json:?}");
        }

        assert_eq!(Command::parse("?").unwrap(), Command::Help);
        assert_eq!(Command::parse(r#"{"command": "?"}"#).unwrap(), Command::Help);
        assert_eq!(
            Command::parse(r#"{"command": "status", "params": {}}"#).unwrap(),
            Command::Status
        );
    }

    #[test]
    fn test_write_range() {
        assert_eq!(Command::parse("w 0").unwrap(), Command::Write { value: 0 });
        assert_eq!(Command::parse("w 255").unwrap(), Command::Write { value: 255 });
        assert!(Command::parse("w 256").unwrap_err().is_usage());
        assert!(Command::parse("w -1").unwrap_err().is_usage());
        assert!(Command::parse("w abc").unwrap_err().is_usage());
    }

    #[test]
    fn test_unknown_command() {
        let err = Command::parse("xyz").unwrap_err();
        assert!(err.to_string().contains("unknown command 'xyz'"));
    }

    #[test]
    fn test_json_commands() {
        assert_eq!(
            Command::parse(r#"{"command": "write", "params": {"value": 200}}"#).unwrap(),
            Command::Write { value: 200 }
        );
        assert_eq!(
            Command::parse(r#"{"command": "open", "params": {"address": "/dev/parport2"}}"#)
                .unwrap(),
            Command::Open {
                address: Some("/dev/parport2".to_string())
            }
        );
        assert_eq!(
            Command::parse(r#"{"command": "open"}"#).unwrap(),
            Command::Open { address: None }
        );
        assert_eq!(Command::parse(r#"{"command": "r"}"#).unwrap(), Command::Read);
    }

    #[test]
    fn test_json_errors() {
        assert!(Command::parse(r#"{"command": "write", "params": {"value": 300}}"#)
            .unwrap_err()
            .is_usage());
        assert!(Command::parse(r#"{"command": "write"}"#).unwrap_err().is_usage());
        assert!(Command::parse(r#"{"command": "read", "params": {"x": 1}}"#)
            .unwrap_err()
            .is_usage());
        assert!(Command::parse(r#"{"cmd": "read"}"#).unwrap_err().is_usage());
        assert!(Command::parse(r#"{"command": "open", "params": [1]}"#)
            .unwrap_err()
            .is_usage());
    }

    #[test]
    fn test_outcome_rendering() {
        assert_eq!(Outcome::Values(vec![0, 200, 0]).to_text().unwrap(), "0 200 0");
        assert_eq!(Outcome::Done.to_text(), None);
        assert_eq!(
            Outcome::Values(vec![7]).to_json(),
            json!({ "status": "ok", "values": [7] })
        );
    }

    #[test]
    fn test_error_json() {
        let err = DeviceError::NotOpen {
            slot: 1,
            path: "/dev/parport1".to_string(),
        };
        assert_eq!(
            error_json(&err),
            json!({
                "status": "error",
                "error": {
                    "type": "UsageError",
                    "message": "Parallel port /dev/parport1 (slot 1) was not opened"
                }
            })
        );
    }

    proptest! {
        #[test]
        fn prop_parse_byte_accepts_exactly_u8_range(value in any::<i64>()) {
            let parsed = parse_byte(value);
            if (0..=255).contains(&value) {
                prop_assert_eq!(parsed.unwrap() as i64, value);
            } else {
                prop_assert!(parsed.unwrap_err().is_usage());
            }
        }

        #[test]
        fn prop_text_write_matches_parse_byte(value in -1000i64..1000) {
            let parsed = Command::parse(&format!("write {value}"));
            match parse_byte(value) {
                Ok(byte) => prop_assert_eq!(parsed.unwrap(), Command::Write { value: byte }),
                Err(_) => prop_assert!(parsed.is_err()),
            }
        }
    }
}
