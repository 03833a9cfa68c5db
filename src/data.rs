//! Data port: the local listener the server connects back to

use crate::error::{Error, Result};
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};

pub struct DataListener {
    listener: TcpListener,
    port: u16,
}

impl DataListener {
    /// Bind the data port and announce it on `console`. Port 0 binds an
    /// ephemeral port; `port()` reports the one actually bound.
    pub fn open(ip: IpAddr, port: u16, console: &mut dyn Write) -> Result<Self> {
        let listener =
            TcpListener::bind(SocketAddr::new(ip, port)).map_err(|source| Error::Bind { port, source })?;
        let port = listener.local_addr()?.port();
        writeln!(console, "data port opened on port {}", port)?;
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn as_std(&self) -> &TcpListener {
        &self.listener
    }

    /// Take one pending connection.
    pub fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept()
    }
}
