//! Control connection to the server

use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Bytes from one unit-sized read on a stream.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReadUnit {
    pub bytes: Vec<u8>,
    /// The peer closed the stream while (or before) this unit was read.
    pub eof: bool,
}

/// Read until `unit` bytes arrive or the peer closes. A short unit is only
/// returned together with `eof`; a stall partway through is waited out so the
/// next call always starts on a unit boundary.
pub fn read_unit<R: Read>(reader: &mut R, unit: usize) -> io::Result<ReadUnit> {
    let mut buf = vec![0u8; unit];
    let mut filled = 0;
    let mut eof = false;
    while filled < unit {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                eof = true;
                break;
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if filled > 0
                    && matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                continue
            }
            Err(e) => return Err(e),
        }
    }
    buf.truncate(filled);
    Ok(ReadUnit { bytes: buf, eof })
}

pub struct ControlChannel {
    stream: TcpStream,
    peer: SocketAddr,
}

impl ControlChannel {
    /// Connect to `host:port`, trying each resolved address in turn.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self> {
        let target = format!("{}:{}", host, port);
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::connection(target.clone(), e))?
            .collect();
        let mut last_err =
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
        for addr in addrs {
            let attempt = match timeout {
                Some(t) => TcpStream::connect_timeout(&addr, t),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(Self { stream, peer: addr }),
                Err(e) => last_err = e,
            }
        }
        Err(Error::connection(target, last_err))
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of this connection: the interface facing the server.
    pub fn local_ip(&self) -> Result<IpAddr> {
        Ok(self.stream.local_addr()?.ip())
    }

    /// Write the whole command line before returning.
    pub fn send_request(&mut self, line: &str) -> Result<()> {
        self.stream
            .write_all(line.as_bytes())
            .and_then(|_| self.stream.flush())
            .map_err(|e| Error::connection(self.peer.to_string(), e))
    }

    /// Blocking read of one unit of status text.
    pub fn receive_text(&mut self, unit: usize) -> Result<ReadUnit> {
        read_unit(&mut self.stream, unit).map_err(|e| Error::connection(self.peer.to_string(), e))
    }

    pub fn into_stream(self) -> TcpStream {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::TcpListener;

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step);
            self.data.read(&mut buf[..n])
        }
    }

    #[test]
    fn read_unit_collects_short_reads() {
        let mut r = Trickle {
            data: Cursor::new(b"abcdefgh".to_vec()),
            step: 3,
        };
        let u = read_unit(&mut r, 8).unwrap();
        assert_eq!(u.bytes, b"abcdefgh");
        assert!(!u.eof);
    }

    #[test]
    fn read_unit_stops_at_close() {
        let mut r = Cursor::new(b"abc".to_vec());
        let u = read_unit(&mut r, 8).unwrap();
        assert_eq!(u.bytes, b"abc");
        assert!(u.eof);

        let again = read_unit(&mut r, 8).unwrap();
        assert!(again.bytes.is_empty());
        assert!(again.eof);
    }

    /// Reader that reports a timeout once after the first `split` bytes.
    struct StallOnce {
        data: Cursor<Vec<u8>>,
        split: usize,
        stalled: bool,
    }

    impl Read for StallOnce {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let pos = self.data.position() as usize;
            if pos < self.split {
                let n = buf.len().min(self.split - pos);
                return self.data.read(&mut buf[..n]);
            }
            if !self.stalled {
                self.stalled = true;
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "stalled"));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn read_unit_waits_out_a_stall_mid_unit() {
        let mut stream = b"AA\0\0".to_vec();
        stream.extend_from_slice(b"BB\0\0");
        let mut r = StallOnce {
            data: Cursor::new(stream),
            split: 2,
            stalled: false,
        };
        let first = read_unit(&mut r, 4).unwrap();
        assert_eq!(first.bytes, b"AA\0\0");
        assert!(!first.eof);
        let second = read_unit(&mut r, 4).unwrap();
        assert_eq!(second.bytes, b"BB\0\0");
        assert!(r.stalled);
    }

    #[test]
    fn stall_before_any_byte_is_an_error() {
        let mut r = StallOnce {
            data: Cursor::new(b"AA".to_vec()),
            split: 0,
            stalled: false,
        };
        let err = read_unit(&mut r, 4).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn connect_refused_is_connection_error() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let err = ControlChannel::connect("127.0.0.1", port, None).err().unwrap();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn send_then_receive_text() {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = l.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut s, _) = l.accept().unwrap();
            let mut buf = [0u8; 16];
            let n = s.read(&mut buf).unwrap();
            s.write_all(b"status text").unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        let mut ch = ControlChannel::connect("127.0.0.1", port, Some(Duration::from_secs(2))).unwrap();
        ch.send_request("-x").unwrap();
        let text = ch.receive_text(4096).unwrap();
        assert_eq!(text.bytes, b"status text");
        assert!(text.eof);
        assert_eq!(server.join().unwrap(), "-x");
    }
}
