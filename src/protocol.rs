//! Wire format shared by the client and the daemon
//!
//! Commands are plain text with no terminator. Every reply unit, on either
//! connection, is a fixed-size block whose payload ends at the first NUL byte.

use crate::error::{Error, Result};
use std::fmt;

// Size of one reply unit on the control and data connections
pub const UNIT_SIZE: usize = 4096;

/// Padding marker that ends the payload inside a unit
pub const PAD: u8 = 0;

pub const LIST_TOKEN: &str = "-l";
pub const GET_TOKEN: &str = "-g";

// Error strings sent by the daemon on the control connection
pub const UNSUPPORTED_MSG: &str =
    "That command is not supported.  Supported commands are -l and -g <filename>";
pub const NOT_FOUND_MSG: &str = "Requested file not found";

// Idle timeouts for the response wait (seconds)
pub mod timeouts {
    // First wait, before anything has arrived
    pub const FIRST_WAIT_SECS: u64 = 60;
    // Every later wait
    pub const NEXT_WAIT_SECS: u64 = 10;
}

/// Command carried by a request. `Get` owns its filename so a filename can
/// only exist for a get.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    List,
    Get { filename: String },
    /// Anything else. Still sent so the server can report the error.
    Other(String),
}

impl Command {
    /// Map a command token and the optional filename operand from the CLI.
    /// Only `-g` uses the filename; any other command ignores it and is
    /// left for the server to judge.
    pub fn parse(token: &str, filename: Option<&str>) -> Result<Self> {
        match (token, filename) {
            (LIST_TOKEN, _) => Ok(Command::List),
            (GET_TOKEN, Some(name)) if !name.is_empty() => Ok(Command::Get {
                filename: name.to_string(),
            }),
            (GET_TOKEN, _) => Err(Error::Usage(format!("{} requires a filename", GET_TOKEN))),
            (other, _) => Ok(Command::Other(other.to_string())),
        }
    }

    /// Whether the server answers this command on a data connection.
    pub fn expects_data(&self) -> bool {
        matches!(self, Command::List | Command::Get { .. })
    }

    pub fn token(&self) -> &str {
        match self {
            Command::List => LIST_TOKEN,
            Command::Get { .. } => GET_TOKEN,
            Command::Other(t) => t,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Get { filename } => write!(f, "{} {}", GET_TOKEN, filename),
            other => f.write_str(other.token()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub data_port: u16,
}

impl Request {
    pub fn new(command: Command, data_port: u16) -> Self {
        Self { command, data_port }
    }

    pub fn filename(&self) -> Option<&str> {
        match &self.command {
            Command::Get { filename } => Some(filename),
            _ => None,
        }
    }

    /// Same request announcing a different data port (after an ephemeral bind).
    pub fn with_data_port(&self, data_port: u16) -> Self {
        Self {
            command: self.command.clone(),
            data_port,
        }
    }
}

/// Encode a request as the command line the server expects.
pub fn encode(request: &Request) -> String {
    match &request.command {
        Command::List => format!("{} {}", LIST_TOKEN, request.data_port),
        Command::Get { filename } => format!("{} {} {}", GET_TOKEN, filename, request.data_port),
        Command::Other(token) => token.clone(),
    }
}

/// Payload of a unit: everything before the first padding byte.
pub fn strip_padding(unit: &[u8]) -> &[u8] {
    match unit.iter().position(|&b| b == PAD) {
        Some(end) => &unit[..end],
        None => unit,
    }
}

/// Build one padded unit. The payload is cut to `unit - 1` bytes so at least
/// one padding byte always follows it.
pub fn pad_unit(payload: &[u8], unit: usize) -> Vec<u8> {
    let mut buf = vec![PAD; unit];
    let n = payload.len().min(unit.saturating_sub(1));
    buf[..n].copy_from_slice(&payload[..n]);
    buf
}

/// Parsed form of a command line received by the daemon.
#[derive(Debug, PartialEq, Eq)]
pub enum Incoming<'a> {
    List { port: u16 },
    Get { filename: &'a str, port: u16 },
    Unsupported,
}

/// Decode a command line as the daemon sees it.
pub fn decode(line: &str) -> Incoming<'_> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(LIST_TOKEN), Some(port), None) => match port.parse() {
            Ok(port) => Incoming::List { port },
            Err(_) => Incoming::Unsupported,
        },
        (Some(GET_TOKEN), Some(filename), Some(port)) if parts.next().is_none() => {
            match port.parse() {
                Ok(port) => Incoming::Get { filename, port },
                Err(_) => Incoming::Unsupported,
            }
        }
        _ => Incoming::Unsupported,
    }
}
