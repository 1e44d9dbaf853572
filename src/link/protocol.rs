//! Host side of the Go/Ack/Done protocol.
//!
//! ```text
//! handshake (serial)   device: S        host: G    device: A
//! handshake (socket)   host: 0x00 K     device: A
//! frame                host: [0x00] G   device: A   host: 768 bytes   device: D (socket) | E? (serial)
//! effect               host: [0x00] c   device: A   [host: value   device: A]   device: D
//! disconnect (socket)  host: 0x00 Q
//! ```
//!
//! Every read is bounded: the transport gives up after one poll interval,
//! the link then rechecks its cancel token and the deadline before trying
//! again.

use super::{FrameSink, LinkState, Transport};
use crate::actor::{CancelToken, Effect};
use crate::buffer::{encode_frame, EncodeFlags, FrameBuffer, FRAME_BYTES};
use crate::error::{Error, Result};
use std::io::{self, ErrorKind};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Device announces it finished booting (serial).
pub const START: u8 = b'S';
/// Host asks to send a frame, or starts the serial session.
pub const GO: u8 = b'G';
/// Device acknowledges.
pub const ACK: u8 = b'A';
/// Device finished a frame or an effect.
pub const DONE: u8 = b'D';
/// Device reports an error.
pub const DEVICE_ERROR: u8 = b'E';
/// Host opens a socket session.
pub const CONNECT: u8 = b'K';
/// Host closes a socket session.
pub const QUIT: u8 = b'Q';
/// Prefix of every socket command.
pub const COMMAND_PREFIX: u8 = 0x00;

/// Wire protocol variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Arduino over USB serial: bare command bytes, RGB payload.
    Serial,
    /// Spark Core over TCP: `0x00`-prefixed commands, GRB payload with no zero bytes.
    Socket,
}

impl Protocol {
    /// How frames are serialized for this variant.
    pub const fn encode_flags(self) -> EncodeFlags {
        match self {
            Self::Serial => EncodeFlags::ZIGZAG,
            Self::Socket => EncodeFlags::ZIGZAG
                .union(EncodeFlags::SWAP_RG)
                .union(EncodeFlags::RESERVE_ZERO),
        }
    }

    fn command(self, code: u8) -> Vec<u8> {
        match self {
            Self::Serial => vec![code],
            Self::Socket => vec![COMMAND_PREFIX, code],
        }
    }
}

/// Read deadlines for the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTimeouts {
    /// How long to wait for `S` or an `A`.
    pub ack: Duration,
    /// How long to wait for `D` after an effect (self-test takes a while).
    pub effect: Duration,
    /// Longest single blocking read before rechecking cancellation.
    pub poll: Duration,
}

impl Default for LinkTimeouts {
    fn default() -> Self {
        Self {
            ack: Duration::from_secs(5),
            effect: Duration::from_secs(30),
            poll: Duration::from_millis(100),
        }
    }
}

/// A device connection and its protocol state.
pub struct Link<T> {
    transport: T,
    protocol: Protocol,
    timeouts: LinkTimeouts,
    state: LinkState,
    cancel: CancelToken,
    frames: u64,
}

impl<T: Transport> Link<T> {
    /// Wrap a transport. Call [`handshake`](Self::handshake) before anything else.
    pub fn new(transport: T, protocol: Protocol, timeouts: LinkTimeouts, cancel: CancelToken) -> Self {
        Self {
            transport,
            protocol,
            timeouts,
            state: LinkState::Disconnected,
            cancel,
            frames: 0,
        }
    }

    /// Current protocol state.
    pub const fn state(&self) -> LinkState {
        self.state
    }

    /// Protocol variant in use.
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Frames sent so far.
    pub const fn frames_sent(&self) -> u64 {
        self.frames
    }

    /// Synchronize with a freshly started device.
    ///
    /// Bytes received before the expected one (boot noise) are discarded
    /// until the ack deadline.
    pub fn handshake(&mut self) -> Result<()> {
        match self.protocol {
            Protocol::Serial => {
                debug!("waiting for start code");
                self.skip_until(START, self.timeouts.ack)?;
                info!("start code received from device");
                self.send(&[GO])?;
                self.expect(ACK)?;
            }
            Protocol::Socket => {
                self.send(&[COMMAND_PREFIX, CONNECT])?;
                self.state = LinkState::AwaitingAck(CONNECT);
                self.skip_until(ACK, self.timeouts.ack)?;
            }
        }
        self.state = LinkState::Idle;
        info!(protocol = ?self.protocol, "device ready");
        Ok(())
    }

    /// One Go/Ack/payload/Done exchange. Returns the payload size.
    pub fn send_frame(&mut self, frame: &FrameBuffer) -> Result<usize> {
        let payload = encode_frame(frame, self.protocol.encode_flags());

        self.send(&self.protocol.command(GO))?;
        self.state = LinkState::AwaitingAck(GO);
        self.expect(ACK)?;

        self.send(&payload)?;
        self.state = LinkState::AwaitingAck(DONE);
        match self.protocol {
            Protocol::Socket => self.expect(DONE)?,
            Protocol::Serial => self.serial_trailer()?,
        }

        self.state = LinkState::Idle;
        self.frames += 1;
        trace!(updates = self.frames, "display updated");
        Ok(FRAME_BYTES)
    }

    /// Run a device-side effect and wait for it to finish.
    pub fn apply(&mut self, effect: Effect) -> Result<()> {
        let code = effect.code();
        self.send(&self.protocol.command(code))?;
        self.state = LinkState::AwaitingAck(code);
        self.expect(ACK)?;

        if let Some(value) = effect.value() {
            let value = match self.protocol {
                // Zero would read as a command prefix
                Protocol::Socket => value.max(1),
                Protocol::Serial => value,
            };
            self.send(&[value])?;
            self.expect(ACK)?;
        }

        self.state = LinkState::AwaitingAck(DONE);
        self.skip_until(DONE, self.timeouts.effect)?;
        self.state = LinkState::Idle;
        debug!(?effect, "effect done");
        Ok(())
    }

    /// Turn every LED off.
    pub fn blank(&mut self) -> Result<()> {
        self.apply(Effect::Blank)
    }

    /// Tell the device we are leaving (socket only).
    pub fn disconnect(&mut self) -> Result<()> {
        if self.protocol == Protocol::Socket && self.state != LinkState::Disconnected {
            self.send(&[COMMAND_PREFIX, QUIT])?;
        }
        self.state = LinkState::Disconnected;
        info!("disconnected from device");
        Ok(())
    }

    /// Give the transport back.
    pub fn close(self) -> T {
        self.transport
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.transport.write_all(bytes)?;
        self.transport.flush()?;
        Ok(())
    }

    /// Require `want` as the next byte.
    fn expect(&mut self, want: u8) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.ack;
        match self.read_byte(want, deadline)? {
            got if got == want => Ok(()),
            DEVICE_ERROR => Err(Error::DeviceError),
            got => Err(Error::protocol(want, got)),
        }
    }

    /// Discard bytes until `want` arrives.
    fn skip_until(&mut self, want: u8, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.read_byte(want, deadline)? {
                got if got == want => return Ok(()),
                DEVICE_ERROR if want != START => return Err(Error::DeviceError),
                got => trace!(byte = got, "discarding unexpected byte"),
            }
        }
    }

    /// After a serial frame the device stays silent unless it has an error.
    fn serial_trailer(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.ack;
        match self.read_byte(DONE, deadline) {
            Ok(DEVICE_ERROR) => Err(Error::DeviceError),
            Ok(other) => {
                trace!(byte = other, "ignoring byte after frame");
                Ok(())
            }
            Err(Error::Timeout { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn read_byte(&mut self, expected: u8, deadline: Instant) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            match self.transport.read(&mut byte) {
                Ok(0) => {
                    self.state = LinkState::Disconnected;
                    return Err(Error::Disconnected);
                }
                Ok(_) => return Ok(byte[0]),
                Err(e) if is_retryable(&e) => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout {
                    expected: char::from(expected),
                });
            }
        }
    }
}

fn is_retryable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

impl<T: Transport> FrameSink for Link<T> {
    fn present(&mut self, frame: &FrameBuffer) -> Result<usize> {
        self.send_frame(frame)
    }

    fn apply(&mut self, effect: Effect) -> Result<()> {
        Self::apply(self, effect)
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.state == LinkState::Disconnected {
            return Ok(());
        }
        let blanked = if self.state == LinkState::Idle {
            self.blank()
        } else {
            // The device is out of step after a failed exchange: send the
            // command anyway, but do not wait for acks that may never come
            self.send(&self.protocol.command(Effect::Blank.code()))
        };
        if let Err(e) = &blanked {
            warn!(error = %e, "blanking failed");
        }
        self.disconnect()?;
        blanked
    }
}

impl<T> std::fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("protocol", &self.protocol)
            .field("state", &self.state)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{decode_frame, Rgb};
    use std::collections::VecDeque;
    use std::io::{Read, Write};

    /// Transport that replays scripted device bytes and records host writes.
    #[derive(Default)]
    struct Scripted {
        replies: VecDeque<u8>,
        written: Vec<u8>,
        eof: bool,
    }

    impl Scripted {
        fn replying(bytes: &[u8]) -> Self {
            Self {
                replies: bytes.iter().copied().collect(),
                ..Default::default()
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.replies.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None if self.eof => Ok(0),
                None => {
                    std::thread::sleep(Duration::from_millis(1));
                    Err(io::Error::from(ErrorKind::WouldBlock))
                }
            }
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn timeouts() -> LinkTimeouts {
        LinkTimeouts {
            ack: Duration::from_millis(50),
            effect: Duration::from_millis(50),
            poll: Duration::from_millis(1),
        }
    }

    fn link(protocol: Protocol, replies: &[u8]) -> Link<Scripted> {
        let mut link = Link::new(Scripted::replying(replies), protocol, timeouts(), CancelToken::new());
        link.state = LinkState::Idle;
        link
    }

    fn checker() -> FrameBuffer {
        let mut frame = FrameBuffer::new();
        for (i, p) in frame.pixels_mut().iter_mut().enumerate() {
            *p = if i % 2 == 0 { Rgb::new(0, 200, 0) } else { Rgb::new(9, 0, 7) };
        }
        frame
    }

    #[test]
    fn test_socket_frame_exchange() {
        let mut link = link(Protocol::Socket, b"AD");
        let frame = checker();
        assert_eq!(link.send_frame(&frame).unwrap(), FRAME_BYTES);
        assert_eq!(link.state(), LinkState::Idle);

        let written = link.close().written;
        assert_eq!(&written[..2], &[0x00, b'G']);
        assert_eq!(written.len(), 2 + FRAME_BYTES);
        assert!(written[2..].iter().all(|&b| b != 0));

        let payload: [u8; FRAME_BYTES] = written[2..].try_into().unwrap();
        let decoded = decode_frame(&payload, Protocol::Socket.encode_flags());
        assert_eq!(decoded.get(0, 0), Some(Rgb::new(1, 200, 1)));
    }

    #[test]
    fn test_socket_frame_requires_done() {
        let mut link = link(Protocol::Socket, b"AX");
        let err = link.send_frame(&checker()).unwrap_err();
        assert!(matches!(err, Error::Protocol { expected: 'D', got: 'X' }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_go_without_ack_is_fatal() {
        let mut link = link(Protocol::Serial, b"Q");
        let err = link.send_frame(&checker()).unwrap_err();
        assert!(matches!(err, Error::Protocol { expected: 'A', got: 'Q' }));

        // Nothing after the Go byte
        assert_eq!(link.close().written, vec![b'G']);
    }

    #[test]
    fn test_serial_frame_tolerates_silence() {
        let mut link = link(Protocol::Serial, b"A");
        link.send_frame(&checker()).unwrap();

        let written = link.close().written;
        assert_eq!(written[0], b'G');
        assert_eq!(written.len(), 1 + FRAME_BYTES);
        // RGB order and untouched zeros on the serial variant
        assert_eq!(&written[1..4], &[0, 200, 0]);
    }

    #[test]
    fn test_serial_error_byte_is_fatal() {
        let mut link = link(Protocol::Serial, b"AE");
        let err = link.send_frame(&checker()).unwrap_err();
        assert!(matches!(err, Error::DeviceError));
    }

    #[test]
    fn test_missing_ack_times_out() {
        let mut link = link(Protocol::Socket, b"");
        let err = link.send_frame(&checker()).unwrap_err();
        assert!(matches!(err, Error::Timeout { expected: 'A' }));
    }

    #[test]
    fn test_closed_connection() {
        let mut link = link(Protocol::Socket, b"");
        link.transport.eof = true;
        assert!(matches!(link.send_frame(&checker()), Err(Error::Disconnected)));
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_serial_handshake_skips_boot_noise() {
        let mut link = Link::new(
            Scripted::replying(b"\xff\x13SA"),
            Protocol::Serial,
            timeouts(),
            CancelToken::new(),
        );
        link.handshake().unwrap();
        assert_eq!(link.state(), LinkState::Idle);
        assert_eq!(link.close().written, vec![b'G']);
    }

    #[test]
    fn test_socket_handshake() {
        let mut link = Link::new(Scripted::replying(b"zA"), Protocol::Socket, timeouts(), CancelToken::new());
        link.handshake().unwrap();
        assert_eq!(link.close().written, vec![0x00, b'K']);
    }

    #[test]
    fn test_handshake_without_start_times_out() {
        let mut link = Link::new(Scripted::default(), Protocol::Serial, timeouts(), CancelToken::new());
        assert!(matches!(link.handshake(), Err(Error::Timeout { expected: 'S' })));
    }

    #[test]
    fn test_brightness_effect() {
        let mut link = link(Protocol::Serial, b"AAD");
        link.apply(Effect::Brightness(40)).unwrap();
        assert_eq!(link.close().written, vec![b'B', 40]);
    }

    #[test]
    fn test_socket_brightness_never_sends_zero() {
        let mut link = link(Protocol::Socket, b"AAD");
        link.apply(Effect::Brightness(0)).unwrap();
        assert_eq!(link.close().written, vec![0x00, b'B', 1]);

        // Serial has no prefix byte to collide with
        let mut serial = Link::new(
            Scripted::replying(b"AAD"),
            Protocol::Serial,
            timeouts(),
            CancelToken::new(),
        );
        serial.state = LinkState::Idle;
        serial.apply(Effect::Brightness(0)).unwrap();
        assert_eq!(serial.close().written, vec![b'B', 0]);
    }

    #[test]
    fn test_effect_value_rejected() {
        let mut link = link(Protocol::Serial, b"AE");
        assert!(matches!(link.apply(Effect::Brightness(255)), Err(Error::DeviceError)));
    }

    #[test]
    fn test_self_test_waits_for_done() {
        let mut link = link(Protocol::Socket, b"A..D");
        link.apply(Effect::SelfTest).unwrap();
        assert_eq!(link.close().written, vec![0x00, b'T']);
    }

    #[test]
    fn test_cancel_interrupts_read() {
        let cancel = CancelToken::new();
        let mut link = Link::new(
            Scripted::default(),
            Protocol::Socket,
            LinkTimeouts {
                ack: Duration::from_secs(60),
                ..timeouts()
            },
            cancel.clone(),
        );
        link.state = LinkState::Idle;
        cancel.cancel();
        assert!(matches!(link.send_frame(&checker()), Err(Error::Cancelled)));
    }

    #[test]
    fn test_shutdown_blanks_then_quits() {
        let mut link = link(Protocol::Socket, b"AD");
        FrameSink::shutdown(&mut link).unwrap();
        assert_eq!(link.state(), LinkState::Disconnected);
        assert_eq!(link.close().written, vec![0x00, b'Z', 0x00, b'Q']);
    }

    #[test]
    fn test_shutdown_after_failure_still_blanks() {
        let mut link = link(Protocol::Socket, b"X");
        assert!(link.send_frame(&checker()).is_err());
        assert_eq!(link.state(), LinkState::AwaitingAck(GO));

        FrameSink::shutdown(&mut link).unwrap();
        assert_eq!(link.state(), LinkState::Disconnected);
        assert_eq!(link.close().written, vec![0x00, b'G', 0x00, b'Z', 0x00, b'Q']);
    }

    #[test]
    fn test_serial_shutdown_after_failure_sends_blank() {
        let mut link = link(Protocol::Serial, b"AE");
        assert!(matches!(link.send_frame(&checker()), Err(Error::DeviceError)));

        FrameSink::shutdown(&mut link).unwrap();
        let written = link.close().written;
        assert_eq!(written.len(), 1 + FRAME_BYTES + 1);
        assert_eq!(written.last(), Some(&b'Z'));
    }
}
