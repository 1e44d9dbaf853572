//! Device emulator for the socket protocol.
//!
//! Plays the Spark Core's part of the conversation so the host side can
//! be exercised without hardware: acknowledges connects and effects,
//! receives frames and hands them to a callback.

use crate::actor::Effect;
use crate::buffer::{decode_frame, FrameBuffer, FRAME_BYTES};
use crate::error::{Error, Result};
use crate::link::{Protocol, ACK, COMMAND_PREFIX, CONNECT, DONE, GO, QUIT};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use tracing::{debug, info};

/// Something the host did during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The host opened the session (`0x00 'K'`).
    Connected,
    /// A full frame arrived, already decoded to logical RGB.
    Frame(FrameBuffer),
    /// The host requested an effect.
    Effect(Effect),
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames received.
    pub frames: u64,
    /// Effects applied.
    pub effects: u64,
}

/// TCP server that accepts host connections one at a time.
#[derive(Debug)]
pub struct Emulator {
    listener: TcpListener,
}

impl Emulator {
    /// Listen on `address`.
    pub fn bind(address: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(address)?;
        info!(addr = ?listener.local_addr().ok(), "emulator listening");
        Ok(Self { listener })
    }

    /// The bound address (useful after binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one host and serve it until it quits or disconnects.
    pub fn serve_one(&self, on_event: impl FnMut(DeviceEvent)) -> Result<SessionStats> {
        let (stream, peer) = self.listener.accept()?;
        stream.set_nodelay(true)?;
        info!(%peer, "host connected");
        let stats = run_session(stream, on_event)?;
        info!(%peer, frames = stats.frames, "host left");
        Ok(stats)
    }
}

/// Serve one session over an established stream.
///
/// Ends cleanly on `0x00 'Q'` or when the host closes between commands.
/// Anything that is not a known command is a protocol error.
pub fn run_session<S: Read + Write>(
    mut stream: S,
    mut on_event: impl FnMut(DeviceEvent),
) -> Result<SessionStats> {
    let mut stats = SessionStats::default();

    loop {
        let Some(prefix) = read_command_byte(&mut stream)? else {
            debug!("host closed the connection");
            return Ok(stats);
        };
        if prefix != COMMAND_PREFIX {
            return Err(Error::protocol(COMMAND_PREFIX, prefix));
        }

        let code = read_byte(&mut stream)?;
        match code {
            CONNECT => {
                reply(&mut stream, ACK)?;
                on_event(DeviceEvent::Connected);
            }
            GO => {
                reply(&mut stream, ACK)?;
                let mut payload = [0u8; FRAME_BYTES];
                stream.read_exact(&mut payload).map_err(eof_to_disconnect)?;
                on_event(DeviceEvent::Frame(decode_frame(
                    &payload,
                    Protocol::Socket.encode_flags(),
                )));
                stats.frames += 1;
                reply(&mut stream, DONE)?;
                debug!(updates = stats.frames, "display updated");
            }
            QUIT => return Ok(stats),
            other => {
                let effect = match other {
                    b'B' => {
                        reply(&mut stream, ACK)?;
                        Effect::Brightness(read_byte(&mut stream)?)
                    }
                    b'T' => Effect::SelfTest,
                    b'Z' => Effect::Blank,
                    _ => return Err(Error::UnknownCommand(other)),
                };
                reply(&mut stream, ACK)?;
                on_event(DeviceEvent::Effect(effect));
                stats.effects += 1;
                reply(&mut stream, DONE)?;
            }
        }
    }
}

fn reply<S: Write>(stream: &mut S, byte: u8) -> Result<()> {
    stream.write_all(&[byte])?;
    stream.flush()?;
    Ok(())
}

fn read_byte<S: Read>(stream: &mut S) -> Result<u8> {
    let mut byte = [0u8; 1];
    stream.read_exact(&mut byte).map_err(eof_to_disconnect)?;
    Ok(byte[0])
}

/// Like `read_byte`, but a closed stream is `None`.
fn read_command_byte<S: Read>(stream: &mut S) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if e.kind() == ErrorKind::ConnectionReset => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }
}

fn eof_to_disconnect(e: io::Error) -> Error {
    if e.kind() == ErrorKind::UnexpectedEof {
        Error::Disconnected
    } else {
        Error::Io(e)
    }
}
