//! ftlink - control + data port transfer client
//!
//! ftlink <host> <port> -l <data_port>
//! ftlink <host> <port> -g <filename> <data_port>

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io;
use std::sync::Arc;

use ftlink::cli::ClientArgs;
use ftlink::client::{self, Outcome};
use ftlink::config::ClientConfig;
use ftlink::exchange::Phase;
use ftlink::logger::{Logger, NoopLogger, TextLogger};
use ftlink::sink::{AssumeYes, ConsolePrompt, OverwritePolicy};

fn main() -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // 128 + SIGINT
        std::process::exit(130);
    })
    .context("Error setting Ctrl-C handler")?;

    let args = ClientArgs::parse();
    let request = match args.request() {
        Ok(r) => r,
        Err(e) => ClientArgs::command()
            .error(ErrorKind::WrongNumberOfValues, e.to_string())
            .exit(),
    };
    let cfg = ClientConfig::load(args.config.as_deref())?;

    // Choose logger once; NoopLogger unless a log file was asked for
    let logger: Arc<dyn Logger> = match args.log_file {
        Some(ref p) => match TextLogger::new(p) {
            Ok(l) => Arc::new(l),
            Err(e) => {
                eprintln!("cannot open log file {}: {}", p.display(), e);
                Arc::new(NoopLogger)
            }
        },
        None => Arc::new(NoopLogger),
    };

    let mut policy: Box<dyn OverwritePolicy> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(ConsolePrompt::stdio())
    };

    if args.verbose {
        eprintln!("ftlink {}", env!("CARGO_PKG_VERSION"));
        eprintln!("Server: {}:{}", args.host, args.port);
        eprintln!("Request: {} (data port {})", request.command, request.data_port);
    }

    let stdout = io::stdout();
    let mut console = stdout.lock();
    let outcome = client::run(
        &args.host,
        args.port,
        &request,
        &cfg,
        policy.as_mut(),
        &mut console,
        logger.as_ref(),
    )
    .with_context(|| format!("exchange with {}:{} failed", args.host, args.port))?;

    if let Outcome::Completed(report) = outcome {
        if args.verbose {
            eprintln!(
                "done: {} payload bytes, data connection {}, {}",
                report.payload_bytes,
                if report.accepted { "accepted" } else { "never opened" },
                match report.phase {
                    Phase::Done => "all sockets closed by peer",
                    Phase::Draining => "idle timeout after a peer closed",
                    Phase::AwaitingAny => "idle timeout before any peer closed",
                }
            );
        }
    }
    Ok(())
}
