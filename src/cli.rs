//! Command-line surfaces for the client and the daemon

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::protocol::{Command, Request};

/// ftlink <host> <port> <command> [<filename>] <data_port>
#[derive(Clone, Debug, Parser)]
#[command(
    author,
    version,
    about = "ftlink - fetch a directory listing (-l) or a file (-g <filename>) over a control + data port pair"
)]
pub struct ClientArgs {
    /// Server host name or address
    pub host: String,

    /// Server control port
    pub port: u16,

    /// -l to list, -g to get a file; any other token is sent as is
    #[arg(allow_hyphen_values = true)]
    pub command: String,

    /// [<filename>] <data_port>; only -g uses the filename
    #[arg(num_args = 1..=2, required = true, value_name = "OPERAND")]
    pub operands: Vec<String>,

    /// TOML file with timeouts and data port settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Append timestamped exchange events to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Overwrite an existing local file without asking
    #[arg(long)]
    pub yes: bool,

    /// Show connection stages on stderr
    #[arg(long)]
    pub verbose: bool,
}

impl ClientArgs {
    /// Build the request from the positional arguments. The last operand is
    /// always the data port; a leading one is the filename.
    pub fn request(&self) -> Result<Request> {
        let (filename, port) = match self.operands.as_slice() {
            [port] => (None, port),
            [filename, port] => (Some(filename.as_str()), port),
            _ => {
                return Err(Error::Usage(format!(
                    "expected [<filename>] <data_port>, got {} operands",
                    self.operands.len()
                )))
            }
        };
        let data_port = port
            .parse::<u16>()
            .map_err(|_| Error::Usage(format!("invalid data port: {}", port)))?;
        let command = Command::parse(&self.command, filename)?;
        Ok(Request::new(command, data_port))
    }
}

/// Daemon options
#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "ftlinkd - serve listings and files to ftlink clients")]
pub struct DaemonOpts {
    /// Control port to listen on
    pub port: u16,

    /// Address to bind
    #[arg(long = "bind-ip", default_value = "0.0.0.0")]
    pub bind_ip: IpAddr,

    /// Directory to serve
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Append timestamped events to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}
