//! Where payload bytes end up: a local file for gets, the console otherwise

use crate::error::Result;
use crate::protocol::Command;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

/// Decides whether an existing local file may be replaced.
pub trait OverwritePolicy {
    fn confirm_overwrite(&mut self, path: &Path) -> io::Result<bool>;
}

pub struct AssumeYes;
impl OverwritePolicy for AssumeYes {
    fn confirm_overwrite(&mut self, _path: &Path) -> io::Result<bool> {
        Ok(true)
    }
}

pub struct AssumeNo;
impl OverwritePolicy for AssumeNo {
    fn confirm_overwrite(&mut self, _path: &Path) -> io::Result<bool> {
        Ok(false)
    }
}

/// Interactive y/n question. Closed input counts as "n".
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> OverwritePolicy for ConsolePrompt<R, W> {
    fn confirm_overwrite(&mut self, _path: &Path) -> io::Result<bool> {
        loop {
            write!(
                self.output,
                "A file with that name already exists.  Do you want to overwrite the old file? Please enter y or n. "
            )?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(false);
            }
            match line.trim() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => writeln!(self.output, "That response is not valid.  Please enter y or n.")?,
            }
        }
    }
}

pub struct FileSink {
    writer: BufWriter<File>,
    bytes: u64,
}

pub enum TransferSink {
    Console,
    File(FileSink),
}

/// Result of setting up the sink for a command.
pub enum Prepared {
    Ready(TransferSink),
    Declined,
}

/// Set up the sink before anything is sent. For a get, an existing file at
/// `dir/filename` is only truncated if `policy` agrees.
pub fn prepare(command: &Command, dir: &Path, policy: &mut dyn OverwritePolicy) -> Result<Prepared> {
    let Command::Get { filename } = command else {
        return Ok(Prepared::Ready(TransferSink::Console));
    };
    let path = dir.join(filename);
    if path.is_file() && !policy.confirm_overwrite(&path)? {
        return Ok(Prepared::Declined);
    }
    let file = File::create(&path)?;
    Ok(Prepared::Ready(TransferSink::File(FileSink {
        writer: BufWriter::new(file),
        bytes: 0,
    })))
}

impl TransferSink {
    /// Console payloads are one entry per unit, so each gets its own line.
    pub fn write_payload(&mut self, console: &mut dyn Write, payload: &[u8]) -> io::Result<()> {
        match self {
            TransferSink::Console => {
                console.write_all(payload)?;
                console.write_all(b"\n")
            }
            TransferSink::File(f) => {
                f.writer.write_all(payload)?;
                f.bytes += payload.len() as u64;
                Ok(())
            }
        }
    }

    /// Terminate the file with a newline and close it. Returns the payload
    /// byte count written to the file.
    pub fn finish(self, console: &mut dyn Write) -> io::Result<u64> {
        match self {
            TransferSink::Console => Ok(0),
            TransferSink::File(mut f) => {
                f.writer.write_all(b"\n")?;
                f.writer.flush()?;
                writeln!(console, "Transfer Complete")?;
                Ok(f.bytes)
            }
        }
    }
}
