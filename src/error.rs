//! Error types for the client and daemon library

use std::io;
use std::path::PathBuf;

/// Failures that end an exchange.
///
/// A declined overwrite is not an error; see [`crate::client::Outcome::Declined`].
/// Error text sent by the server is printed, never turned into a variant here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("usage: {0}")]
    Usage(String),

    #[error("connection to {addr} failed: {source}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot open data port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("config {path}: {msg}")]
    Config { path: PathBuf, msg: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn connection(addr: impl Into<String>, source: io::Error) -> Self {
        Error::Connection {
            addr: addr.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
