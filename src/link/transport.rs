//! Byte pipes to the device: serial port or TCP socket.

use crate::error::{Error, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info};

/// A blocking, bidirectional byte stream to the device.
///
/// Reads are expected to give up after a short timeout with
/// [`io::ErrorKind::TimedOut`] or [`io::ErrorKind::WouldBlock`], so the
/// link can recheck its cancel token between attempts.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// USB serial connection (Arduino variant), 8N1.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `path` at `baud`. Each read waits at most `read_timeout`.
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<Self> {
        if baud == 0 {
            return Err(Error::Config("baud rate must be positive".into()));
        }
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()?;
        info!(port = path, baud, "serial port opened");
        Ok(Self { port })
    }
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish()
    }
}

/// TCP connection (Spark Core / emulator variant).
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `address`, trying each resolved address in turn.
    pub fn connect(address: &str, connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let mut last_error = None;
        for addr in address.to_socket_addrs()? {
            debug!(%addr, "connecting");
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => return Self::from_stream(stream, read_timeout),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error
            .map_or_else(|| Error::Config(format!("address {address:?} did not resolve")), Error::Io))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, read_timeout: Duration) -> Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(read_timeout))?;
        info!(peer = ?stream.peer_addr().ok(), "connected");
        Ok(Self { stream })
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_tcp_read_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut transport =
            TcpTransport::connect(&addr, Duration::from_secs(1), Duration::from_millis(20)).unwrap();
        let (_peer, _) = listener.accept().unwrap();

        let mut byte = [0u8; 1];
        let err = transport.read(&mut byte).unwrap_err();
        assert!(matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn test_serial_rejects_zero_baud() {
        let err = SerialTransport::open("/dev/null", 0, Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
