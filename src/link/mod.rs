//! Device link: where frames and effects leave the process.
//!
//! - [`Transport`]: raw byte pipe ([`SerialTransport`], [`TcpTransport`])
//! - [`Link`]: the Go/Ack/Done protocol on top of a transport
//! - [`FrameSink`]: what the transmit actor talks to; implemented by
//!   [`Link`] and by the terminal preview

mod protocol;
mod transport;

pub use protocol::{
    Link, LinkTimeouts, Protocol, ACK, COMMAND_PREFIX, CONNECT, DEVICE_ERROR, DONE, GO, QUIT, START,
};
pub use transport::{SerialTransport, TcpTransport, Transport};

use crate::actor::Effect;
use crate::buffer::FrameBuffer;
use crate::error::Result;

/// Protocol state of a [`Link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// No session, or the session ended.
    Disconnected,
    /// Handshake done, nothing in flight.
    Idle,
    /// Command or payload sent; waiting on the device. Holds the command byte.
    AwaitingAck(u8),
}

/// Destination for frames and effects, owned by the transmit actor.
pub trait FrameSink: Send {
    /// Show one frame. Returns the number of payload bytes written.
    fn present(&mut self, frame: &FrameBuffer) -> Result<usize>;

    /// Run a one-off effect to completion.
    fn apply(&mut self, effect: Effect) -> Result<()>;

    /// Blank the display (best effort) and release the device.
    fn shutdown(&mut self) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn present(&mut self, frame: &FrameBuffer) -> Result<usize> {
        (**self).present(frame)
    }

    fn apply(&mut self, effect: Effect) -> Result<()> {
        (**self).apply(effect)
    }

    fn shutdown(&mut self) -> Result<()> {
        (**self).shutdown()
    }
}
