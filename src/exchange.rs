//! Response multiplexer
//!
//! Drives the control connection, the data listener and (after one accept)
//! the data connection from a single wait set until every socket has been
//! closed by its peer or the idle timeout fires.
//!
//! Routing:
//! - control bytes are status/error text and go to the console
//! - data bytes are listing entries (list) or file content (get)
//! - a listener becoming ready means the server connected back; the accepted
//!   stream takes the listener's place and is read from the next pass on

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use crate::config::ClientConfig;
use crate::control::read_unit;
use crate::data::DataListener;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::protocol::{strip_padding, Command};
use crate::reactor::{Endpoint, Role, Token, WaitSet};
use crate::sink::TransferSink;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has closed yet.
    #[default]
    AwaitingAny,
    /// At least one socket closed, others still open.
    Draining,
    /// Every socket was closed by its peer.
    Done,
}

/// What the exchange saw, in arrival order.
#[derive(Debug, Default)]
pub struct ExchangeReport {
    pub control_text: Vec<String>,
    pub listing: Vec<String>,
    /// Payload bytes after padding was stripped.
    pub payload_bytes: u64,
    pub accepted: bool,
    pub timed_out: bool,
    /// Roles in the order their peers closed them.
    pub closed: Vec<Role>,
    /// Roles still open when the idle timeout fired.
    pub left_open: Vec<Role>,
    /// Where the exchange stopped. Anything but `Done` means the idle
    /// timeout ended it.
    pub phase: Phase,
}

pub struct Exchange<'a> {
    command: &'a Command,
    set: WaitSet,
    sink: TransferSink,
    console: &'a mut dyn Write,
    logger: &'a dyn Logger,
    control_peer: SocketAddr,
    unit: usize,
    first_wait: Duration,
    next_wait: Duration,
    phase: Phase,
    report: ExchangeReport,
}

impl<'a> Exchange<'a> {
    /// Build the initial wait set. The listener is only registered for
    /// commands the server answers on a data connection.
    pub fn new(
        command: &'a Command,
        control: TcpStream,
        listener: Option<DataListener>,
        sink: TransferSink,
        cfg: &ClientConfig,
        console: &'a mut dyn Write,
        logger: &'a dyn Logger,
    ) -> Result<Self> {
        let control_peer = control.peer_addr()?;
        let mut set = WaitSet::new();
        set.register(Role::Control, Endpoint::Stream(control));
        if let Some(listener) = listener.filter(|_| command.expects_data()) {
            set.register(Role::Listener, Endpoint::Listener(listener));
        }
        Ok(Self {
            command,
            set,
            sink,
            console,
            logger,
            control_peer,
            unit: cfg.unit_size,
            first_wait: cfg.first_wait(),
            next_wait: cfg.next_wait(),
            phase: Phase::AwaitingAny,
            report: ExchangeReport::default(),
        })
    }

    /// Run until the wait set drains or goes idle. Any sockets still open
    /// at that point are closed when the exchange is dropped.
    pub fn run(mut self) -> Result<ExchangeReport> {
        let started = Instant::now();
        let mut timeout = self.first_wait;
        while !self.set.is_empty() {
            let ready = self.set.wait(timeout)?;
            if ready.is_empty() {
                self.logger.timed_out(timeout.as_secs());
                self.report.timed_out = true;
                self.report.left_open = self.set.roles();
                break;
            }
            timeout = self.next_wait;
            for token in ready {
                self.service(token)?;
            }
        }
        if self.set.is_empty() {
            self.phase = Phase::Done;
        }

        let Exchange {
            set,
            sink,
            console,
            logger,
            phase,
            mut report,
            ..
        } = self;
        report.phase = phase;
        drop(set);
        sink.finish(console)?;
        logger.done(report.payload_bytes, started.elapsed().as_secs_f64());
        Ok(report)
    }

    fn service(&mut self, token: Token) -> Result<()> {
        let Some(role) = self.set.role(token) else {
            return Ok(());
        };
        match role {
            Role::Listener => self.accept(token),
            Role::Control | Role::Data => self.read(token, role),
        }
    }

    fn accept(&mut self, token: Token) -> Result<()> {
        let accepted = match self.set.endpoint_mut(token) {
            Some(Endpoint::Listener(l)) => l.accept()?,
            _ => return Ok(()),
        };
        let (stream, peer) = accepted;
        self.set.replace(token, Role::Data, Endpoint::Stream(stream));
        self.report.accepted = true;
        self.logger.accepted(&peer);
        Ok(())
    }

    fn read(&mut self, token: Token, role: Role) -> Result<()> {
        let result = match self.set.endpoint_mut(token) {
            Some(Endpoint::Stream(s)) => read_unit(s, self.unit),
            _ => return Ok(()),
        };
        let unit = result.map_err(|e| match role {
            Role::Control => Error::connection(self.control_peer.to_string(), e),
            _ => Error::Io(e),
        })?;

        if !unit.bytes.is_empty() {
            self.logger.received(role, unit.bytes.len());
            self.deliver(role, &unit.bytes)?;
        }
        if unit.eof {
            self.set.remove(token);
            self.logger.closed(role);
            self.report.closed.push(role);
            if self.phase == Phase::AwaitingAny {
                self.phase = Phase::Draining;
            }
        }
        Ok(())
    }

    fn deliver(&mut self, role: Role, bytes: &[u8]) -> Result<()> {
        let payload = strip_padding(bytes);
        match (role, self.command) {
            (Role::Control, _) => {
                if payload.is_empty() {
                    return Ok(());
                }
                let text = String::from_utf8_lossy(payload).into_owned();
                writeln!(self.console, "{}", text)?;
                self.report.control_text.push(text);
            }
            (Role::Data, Command::Get { .. }) => {
                self.sink.write_payload(self.console, payload)?;
                self.report.payload_bytes += payload.len() as u64;
            }
            (Role::Data, _) => {
                if payload.is_empty() {
                    return Ok(());
                }
                self.sink.write_payload(self.console, payload)?;
                self.report.payload_bytes += payload.len() as u64;
                self.report
                    .listing
                    .push(String::from_utf8_lossy(payload).into_owned());
            }
            (Role::Listener, _) => {}
        }
        Ok(())
    }
}
