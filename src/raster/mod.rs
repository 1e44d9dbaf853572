//! Rasterizers: everything that turns content into pixels.
//!
//! - [`text`]: string into a scrollable [`DisplayBuffer`](crate::DisplayBuffer)
//! - [`image`]: 16x16 still or animated GIF into frames
//! - [`clock`]: wall-clock time into a frame
//! - [`font`]: the glyph tables behind `text` and `clock`

pub mod clock;
pub mod font;
pub mod image;
pub mod text;

pub use clock::{ClockFace, ClockReading};
pub use image::{ImageFrame, ImageSequence};
pub use text::render_text;
