//! Readiness wait set over poll(2)
//!
//! Each registered socket carries a role tag so callers dispatch on what a
//! socket is for rather than on which socket it is.

use std::fmt;
use std::io;
use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

use crate::data::DataListener;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Control,
    Listener,
    Data,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Control => "control",
            Role::Listener => "listener",
            Role::Data => "data",
        })
    }
}

pub enum Endpoint {
    Stream(TcpStream),
    Listener(DataListener),
}

impl Endpoint {
    fn raw_fd(&self) -> RawFd {
        match self {
            Endpoint::Stream(s) => s.as_raw_fd(),
            Endpoint::Listener(l) => l.as_std().as_raw_fd(),
        }
    }
}

/// Handle to a wait set entry. Never reused within one set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Token(usize);

struct Entry {
    token: Token,
    role: Role,
    endpoint: Endpoint,
}

#[derive(Default)]
pub struct WaitSet {
    entries: Vec<Entry>,
    next: usize,
}

impl WaitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, role: Role, endpoint: Endpoint) -> Token {
        let token = Token(self.next);
        self.next += 1;
        self.entries.push(Entry {
            token,
            role,
            endpoint,
        });
        token
    }

    /// Swap an entry for a new one in the same slot. The old endpoint is
    /// returned and the new entry gets a fresh token, so readiness reported
    /// for the old token never reaches the new socket.
    pub fn replace(&mut self, token: Token, role: Role, endpoint: Endpoint) -> Option<(Token, Endpoint)> {
        let idx = self.position(token)?;
        let fresh = Token(self.next);
        self.next += 1;
        let old = std::mem::replace(
            &mut self.entries[idx],
            Entry {
                token: fresh,
                role,
                endpoint,
            },
        );
        Some((fresh, old.endpoint))
    }

    pub fn remove(&mut self, token: Token) -> Option<(Role, Endpoint)> {
        let idx = self.position(token)?;
        let entry = self.entries.remove(idx);
        Some((entry.role, entry.endpoint))
    }

    pub fn role(&self, token: Token) -> Option<Role> {
        self.position(token).map(|i| self.entries[i].role)
    }

    pub fn endpoint_mut(&mut self, token: Token) -> Option<&mut Endpoint> {
        let idx = self.position(token)?;
        Some(&mut self.entries[idx].endpoint)
    }

    pub fn roles(&self) -> Vec<Role> {
        self.entries.iter().map(|e| e.role).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, token: Token) -> Option<usize> {
        self.entries.iter().position(|e| e.token == token)
    }

    /// Block until at least one entry is readable or `timeout` passes.
    /// Returns ready tokens in registration order; empty means timed out.
    /// Hangup and error conditions count as readable so the following read
    /// observes them.
    pub fn wait(&self, timeout: Duration) -> io::Result<Vec<Token>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let mut fds: Vec<libc::pollfd> = self
            .entries
            .iter()
            .map(|e| libc::pollfd {
                fd: e.endpoint.raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let ms = remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
            let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, ms) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if rc == 0 {
                return Ok(Vec::new());
            }
            let ready_mask = libc::POLLIN | libc::POLLHUP | libc::POLLERR;
            return Ok(fds
                .iter()
                .zip(&self.entries)
                .filter(|(fd, _)| fd.revents & ready_mask != 0)
                .map(|(_, e)| e.token)
                .collect());
        }
    }
}

impl From<TcpStream> for Endpoint {
    fn from(stream: TcpStream) -> Self {
        Endpoint::Stream(stream)
    }
}
