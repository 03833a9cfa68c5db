//! One request/response exchange, start to finish

use std::io::Write;

use crate::config::ClientConfig;
use crate::control::ControlChannel;
use crate::data::DataListener;
use crate::error::Result;
use crate::exchange::{Exchange, ExchangeReport};
use crate::logger::Logger;
use crate::protocol::{encode, Request};
use crate::sink::{self, OverwritePolicy, Prepared};

#[derive(Debug)]
pub enum Outcome {
    Completed(ExchangeReport),
    /// The user kept an existing local file; nothing was sent.
    Declined,
}

/// Connect, set up the sink and data port, send the request and drive the
/// responses to completion. Every socket opened here is closed before
/// returning, on success and on error.
pub fn run(
    host: &str,
    port: u16,
    request: &Request,
    cfg: &ClientConfig,
    policy: &mut dyn OverwritePolicy,
    console: &mut dyn Write,
    logger: &dyn Logger,
) -> Result<Outcome> {
    let mut control = ControlChannel::connect(host, port, cfg.connect_timeout())?;
    logger.connected(&control.peer());

    let sink = match sink::prepare(&request.command, &cfg.download_dir, policy)? {
        Prepared::Ready(sink) => sink,
        Prepared::Declined => {
            writeln!(console, "Exiting program")?;
            return Ok(Outcome::Declined);
        }
    };

    let listener = if request.command.expects_data() {
        let ip = match cfg.data_bind_ip {
            Some(ip) => ip,
            None => control.local_ip()?,
        };
        let listener = DataListener::open(ip, request.data_port, console)?;
        logger.listening(listener.port());
        Some(listener)
    } else {
        None
    };

    // Announce the port actually bound (differs when 0 asked for an ephemeral one)
    let request = match &listener {
        Some(l) => request.with_data_port(l.port()),
        None => request.clone(),
    };
    let line = encode(&request);
    control.send_request(&line)?;
    logger.request_sent(&line);

    let report = Exchange::new(
        &request.command,
        control.into_stream(),
        listener,
        sink,
        cfg,
        console,
        logger,
    )?
    .run()?;
    Ok(Outcome::Completed(report))
}
