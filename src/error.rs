//! Error type shared by every stage of the frame pipeline.
//!
//! Failures fall into three groups:
//! - **Configuration**: bad port, baud rate or scroll speed. Reported before
//!   anything touches the device.
//! - **Protocol**: unexpected handshake byte, device-reported error, read
//!   timeout, dropped connection. These are fatal: the transmit actor blanks
//!   the display (best effort), disconnects and stops every producer.
//! - **Content**: missing image, wrong image size, undecodable file. Fatal for
//!   a single image, skipped inside a batch.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the frame pipeline and the device link.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Scroll speed outside 1..=10.
    #[error("scroll speed must be an integer from 1 to 10, got {0}")]
    ScrollSpeed(u8),

    /// The device answered with an unexpected byte.
    #[error("protocol violation: expected {expected:?}, got {got:?}")]
    Protocol {
        /// Byte the protocol required at this point.
        expected: char,
        /// Byte actually received.
        got: char,
    },

    /// A socket command byte that is not part of the protocol.
    #[error("unknown command byte 0x{0:02x}")]
    UnknownCommand(u8),

    /// The device reported an error (`E`).
    #[error("device reported an error")]
    DeviceError,

    /// No byte arrived before the acknowledgement deadline.
    #[error("timed out waiting for {expected:?} from device")]
    Timeout {
        /// Byte the protocol was waiting for.
        expected: char,
    },

    /// The link was closed by the device.
    #[error("device closed the connection")]
    Disconnected,

    /// A blocking operation was interrupted by the cancel token.
    #[error("operation cancelled")]
    Cancelled,

    /// The transmit actor is gone (stopped or failed).
    #[error("transmit loop is not running")]
    TransmitStopped,

    /// Images must be exactly 16x16.
    #[error("only 16x16 images are supported, got {width}x{height}")]
    ImageSize {
        /// Width of the rejected image.
        width: u32,
        /// Height of the rejected image.
        height: u32,
    },

    /// Image decoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Opening or configuring the serial port failed.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error ends the session with the device.
    ///
    /// Content errors are not fatal on their own: a batch skips the item.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. }
                | Self::UnknownCommand(_)
                | Self::DeviceError
                | Self::Timeout { .. }
                | Self::Disconnected
                | Self::Io(_)
                | Self::Serial(_)
                | Self::TransmitStopped
        )
    }

    pub(crate) fn protocol(expected: u8, got: u8) -> Self {
        Self::Protocol {
            expected: char::from(expected),
            got: char::from(got),
        }
    }
}
