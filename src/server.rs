//! ftlinkd: serves listings and files from a root directory
//!
//! One client at a time. For each control connection the daemon reads a
//! single command, connects back to the client's data port for `-l` and
//! `-g`, streams padded units, then closes both connections. Problems the
//! client should see (unknown command, missing file) go back as one padded
//! unit on the control connection.

use std::fs;
use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::protocol::{decode, pad_unit, strip_padding, Incoming, NOT_FOUND_MSG, UNIT_SIZE, UNSUPPORTED_MSG};

// How long to wait for the command after a client connects
const COMMAND_READ_TIMEOUT: Duration = Duration::from_secs(30);

pub fn bind(ip: IpAddr, port: u16) -> Result<TcpListener> {
    TcpListener::bind(SocketAddr::new(ip, port)).map_err(|source| Error::Bind { port, source })
}

/// Accept loop. Per-connection failures are reported and the loop goes on.
pub fn serve(listener: TcpListener, root: &Path, logger: &dyn Logger) -> Result<()> {
    let root = root.canonicalize()?;
    eprintln!(
        "ftlinkd listening on {} root={}",
        listener.local_addr()?,
        root.display()
    );
    for conn in listener.incoming() {
        match conn {
            Ok(stream) => {
                let peer = stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                eprintln!("Client connected: {}", peer);
                if let Err(e) = handle_client(stream, &root, logger) {
                    eprintln!("connection error from {}: {}", peer, e);
                    logger.error("client", &e.to_string());
                }
            }
            Err(e) => {
                eprintln!("accept error: {}", e);
            }
        }
    }
    Ok(())
}

/// Serve one control connection. Returns once both connections are closed.
pub fn handle_client(mut control: TcpStream, root: &Path, logger: &dyn Logger) -> Result<()> {
    let peer = control.peer_addr()?;
    logger.connected(&peer);
    control.set_read_timeout(Some(COMMAND_READ_TIMEOUT))?;

    let mut buf = vec![0u8; UNIT_SIZE];
    let n = control.read(&mut buf)?;
    if n == 0 {
        return Ok(());
    }
    let line = String::from_utf8_lossy(strip_padding(&buf[..n])).into_owned();
    let line = line.trim();
    logger.request_received(line);

    match decode(line) {
        Incoming::List { port } => {
            let mut data = connect_back(peer.ip(), port)?;
            logger.connected(&data.peer_addr()?);
            let sent = send_listing(&mut data, root)?;
            logger.done(sent, 0.0);
        }
        Incoming::Get { filename, port } => match resolve_under_root(root, Path::new(filename)) {
            Ok(path) if path.is_file() => {
                eprintln!("Transmitting file {}", filename);
                let mut data = connect_back(peer.ip(), port)?;
                logger.connected(&data.peer_addr()?);
                let sent = send_file(&mut data, &path)?;
                eprintln!("Transfer Complete");
                logger.done(sent, 0.0);
            }
            _ => {
                eprintln!("{}", NOT_FOUND_MSG);
                control.write_all(&pad_unit(NOT_FOUND_MSG.as_bytes(), UNIT_SIZE))?;
            }
        },
        Incoming::Unsupported => {
            eprintln!("Unsupported command received");
            control.write_all(&pad_unit(UNSUPPORTED_MSG.as_bytes(), UNIT_SIZE))?;
        }
    }
    Ok(())
}

fn connect_back(ip: IpAddr, port: u16) -> Result<TcpStream> {
    let addr = SocketAddr::new(ip, port);
    TcpStream::connect(addr).map_err(|e| Error::connection(addr.to_string(), e))
}

/// One unit per directory entry, in directory order.
fn send_listing(data: &mut TcpStream, root: &Path) -> Result<u64> {
    let mut sent = 0u64;
    for entry in fs::read_dir(root)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        data.write_all(&pad_unit(name.as_bytes(), UNIT_SIZE))?;
        sent += name.len() as u64;
    }
    Ok(sent)
}

/// File content in units of `UNIT_SIZE - 1` bytes, each padded. One trailing
/// newline is dropped; the client appends its own.
fn send_file(data: &mut TcpStream, path: &Path) -> Result<u64> {
    let content = fs::read(path)?;
    let body = content.strip_suffix(b"\n").unwrap_or(&content);
    if body.is_empty() {
        data.write_all(&pad_unit(&[], UNIT_SIZE))?;
        return Ok(0);
    }
    for chunk in body.chunks(UNIT_SIZE - 1) {
        data.write_all(&pad_unit(chunk, UNIT_SIZE))?;
    }
    Ok(body.len() as u64)
}

/// Map a requested name to a path inside `root`. Only plain relative
/// components are accepted, and the resolved path must stay under `root`
/// after symlinks are followed.
pub fn resolve_under_root(root: &Path, requested: &Path) -> Result<PathBuf> {
    let mut rel = PathBuf::new();
    for component in requested.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(s) => rel.push(s),
            other => {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("path component not allowed: {:?}", other),
                )))
            }
        }
    }
    let joined = root.join(&rel);
    let resolved = if joined.exists() {
        joined.canonicalize()?
    } else {
        joined
    };
    if !resolved.starts_with(root) {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("{} escapes the served root", requested.display()),
        )));
    }
    Ok(resolved)
}
