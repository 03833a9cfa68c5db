//! ftlink library
//!
//! Client and daemon for a two-connection transfer protocol: commands and
//! status text travel on a control connection, listings and file content on
//! a per-request data connection that the server opens back to the client.

#[cfg(not(unix))]
compile_error!("ftlink waits on sockets with poll(2) and only builds for unix targets");

pub mod cli;
pub mod client;
pub mod config;
pub mod control;
pub mod data;
pub mod error;
pub mod exchange;
pub mod logger;
pub mod protocol;
pub mod reactor;
pub mod server;
pub mod sink;
