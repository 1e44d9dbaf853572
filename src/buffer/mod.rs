//! Buffer module: Pixel storage and the wire encoder.
//!
//! This module contains:
//! - [`Rgb`]: One LED's color
//! - [`FrameBuffer`]: The 16x16 grid shown on the matrix
//! - [`DisplayBuffer`]: The wide strip rendered text scrolls through
//! - [`encode`]: Zigzag compensation and byte serialization

mod display;
mod frame;
mod pixel;
pub mod encode;

pub use display::{DisplayBuffer, GLYPH_WIDTH};
pub use encode::{decode_frame, encode_frame, encode_into, zigzag, EncodeFlags, FRAME_BYTES};
pub use frame::{line_points, FrameBuffer, HEIGHT, PIXEL_COUNT, WIDTH};
pub use pixel::{ParseRgbError, Rgb};
