//! # SuperLED
//!
//! A frame pipeline and device driver for 16x16 RGB LED matrices.
//!
//! Producers (text scroller, image player, clock) draw into a shared frame;
//! a transmit thread encodes each ready frame and sends it over a serial or
//! TCP link using a small Go/Ack/Done protocol.
//!
//! ## Core Concepts
//!
//! - **Single-slot frame hand-off**: producers overwrite, the transmitter sends
//!   the newest frame and never a stale one twice
//! - **Zigzag encoding**: the physical strip snakes, so odd rows are reversed
//!   on the wire
//! - **Anti-aliased scrolling**: ten blended sub-steps between pixel columns
//! - **Fail-stop**: any protocol error blanks the display, disconnects and
//!   stops every producer
//!
//! ## Example
//!
//! ```rust
//! use superled::{encode_frame, EncodeFlags, FrameBuffer, Rgb};
//!
//! let mut frame = FrameBuffer::filled(Rgb::BLACK);
//! frame.set(0, 1, Rgb::RED);
//!
//! // Row 1 runs right to left on the strip
//! let bytes = encode_frame(&frame, EncodeFlags::ZIGZAG);
//! assert_eq!(&bytes[31 * 3..32 * 3], &[255, 0, 0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod buffer;
pub mod color;
pub mod config;
pub mod display;
pub mod emulator;
pub mod error;
pub mod link;
pub mod raster;
pub mod scroll;
pub mod terminal;

// Re-exports for convenience
pub use actor::{CancelToken, Effect, FrameHandle, FrameSlot, TransmitActor, TransmitStats};
pub use buffer::{encode_frame, DisplayBuffer, EncodeFlags, FrameBuffer, Rgb, FRAME_BYTES};
pub use config::{Config, LinkKind};
pub use display::{Display, ImageOptions};
pub use emulator::{DeviceEvent, Emulator};
pub use error::{Error, Result};
pub use link::{FrameSink, Link, LinkState, Protocol};
pub use raster::{render_text, ClockFace, ImageSequence};
pub use scroll::{ScrollSpeed, Scroller};
pub use terminal::TerminalPreview;
