use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;

use crate::reactor::Role;

/// Exchange event hooks. Every hook defaults to a no-op.
pub trait Logger: Send + Sync {
    fn connected(&self, _peer: &SocketAddr) {}
    fn listening(&self, _port: u16) {}
    fn request_sent(&self, _line: &str) {}
    fn request_received(&self, _line: &str) {}
    fn accepted(&self, _peer: &SocketAddr) {}
    fn received(&self, _role: Role, _bytes: usize) {}
    fn closed(&self, _role: Role) {}
    fn timed_out(&self, _seconds: u64) {}
    fn done(&self, _bytes: u64, _seconds: f64) {}
    fn error(&self, _context: &str, _msg: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn connected(&self, peer: &SocketAddr) {
        self.line(&format!("CONNECT peer={}", peer));
    }
    fn listening(&self, port: u16) {
        self.line(&format!("LISTEN port={}", port));
    }
    fn request_sent(&self, line: &str) {
        self.line(&format!("SEND cmd={:?}", line));
    }
    fn request_received(&self, line: &str) {
        self.line(&format!("COMMAND cmd={:?}", line));
    }
    fn accepted(&self, peer: &SocketAddr) {
        self.line(&format!("ACCEPT peer={}", peer));
    }
    fn received(&self, role: Role, bytes: usize) {
        self.line(&format!("RECV role={} bytes={}", role, bytes));
    }
    fn closed(&self, role: Role) {
        self.line(&format!("CLOSE role={}", role));
    }
    fn timed_out(&self, seconds: u64) {
        self.line(&format!("IDLE seconds={}", seconds));
    }
    fn done(&self, bytes: u64, seconds: f64) {
        self.line(&format!("DONE bytes={bytes} seconds={seconds:.3}"));
    }
    fn error(&self, context: &str, msg: &str) {
        self.line(&format!("ERROR ctx={} msg={}", context, msg));
    }
}
