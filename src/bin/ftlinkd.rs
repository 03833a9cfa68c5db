use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use ftlink::cli::DaemonOpts;
use ftlink::logger::{Logger, NoopLogger, TextLogger};
use ftlink::server;

fn main() -> Result<()> {
    let opts = DaemonOpts::parse();

    // Validate root directory exists and is a directory
    if !opts.root.exists() {
        anyhow::bail!("Error: Root directory does not exist: {}", opts.root.display());
    }
    if !opts.root.is_dir() {
        anyhow::bail!("Error: Root path is not a directory: {}", opts.root.display());
    }

    ctrlc::set_handler(move || {
        eprintln!("\nftlinkd stopping (Ctrl-C)");
        std::process::exit(130);
    })
    .context("Error setting Ctrl-C handler")?;

    let logger: Arc<dyn Logger> = match opts.log_file {
        Some(ref p) => Arc::new(
            TextLogger::new(p).with_context(|| format!("Failed to open log file: {}", p.display()))?,
        ),
        None => Arc::new(NoopLogger),
    };

    let listener = server::bind(opts.bind_ip, opts.port)
        .with_context(|| format!("Failed to bind {}:{}", opts.bind_ip, opts.port))?;

    if opts.bind_ip.is_unspecified() {
        eprintln!("WARNING: listening on all interfaces; there is no authentication");
    }

    server::serve(listener, &opts.root, logger.as_ref()).context("server stopped")
}
