//! Frame encoder: Turn a frame snapshot into the 768-byte wire payload.
//!
//! The LED strip on the matrix snakes through the rows: even rows run left to
//! right, odd rows right to left. The encoder compensates for that wiring and
//! for the channel order and reserved bytes of the target device:
//! 1. Reverse the pixels of every odd row (values untouched)
//! 2. Optionally substitute every zero channel with 1 (zero is a control byte)
//! 3. Serialize row-major, three bytes per pixel, in R,G,B or G,R,B order

use super::frame::{FrameBuffer, HEIGHT, PIXEL_COUNT, WIDTH};
use super::pixel::Rgb;
use bitflags::bitflags;

/// Size of one encoded frame on the wire.
pub const FRAME_BYTES: usize = PIXEL_COUNT * 3;

bitflags! {
    /// Wire format options.
    ///
    /// # Example
    /// ```
    /// use superled::EncodeFlags;
    /// let socket = EncodeFlags::ZIGZAG | EncodeFlags::SWAP_RG | EncodeFlags::RESERVE_ZERO;
    /// assert!(socket.contains(EncodeFlags::ZIGZAG));
    /// ```
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EncodeFlags: u8 {
        /// Reverse odd rows to match serpentine wiring
        const ZIGZAG = 0b0000_0001;
        /// Emit G,R,B instead of R,G,B
        const SWAP_RG = 0b0000_0010;
        /// Never emit 0x00 (substitute 1)
        const RESERVE_ZERO = 0b0000_0100;
    }
}

impl std::fmt::Debug for EncodeFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

/// Reverse the order of pixels in every odd row, in place.
///
/// Applying it twice restores the original arrangement.
pub fn zigzag(frame: &mut FrameBuffer) {
    for y in (1..HEIGHT).step_by(2) {
        frame.row_mut(y).reverse();
    }
}

/// Encode a frame into its wire representation.
pub fn encode_frame(frame: &FrameBuffer, flags: EncodeFlags) -> [u8; FRAME_BYTES] {
    let mut out = [0u8; FRAME_BYTES];
    encode_into(frame, flags, &mut out);
    out
}

/// Encode a frame into a caller-provided buffer.
pub fn encode_into(frame: &FrameBuffer, flags: EncodeFlags, out: &mut [u8; FRAME_BYTES]) {
    let pixels = frame.pixels();

    for (y, row) in out.chunks_exact_mut(WIDTH * 3).enumerate() {
        let reversed = flags.contains(EncodeFlags::ZIGZAG) && y % 2 == 1;

        for (x, bytes) in row.chunks_exact_mut(3).enumerate() {
            let src_x = if reversed { WIDTH - 1 - x } else { x };
            let mut pixel = pixels[y * WIDTH + src_x];

            if flags.contains(EncodeFlags::RESERVE_ZERO) {
                pixel = pixel.reserve_zero();
            }

            if flags.contains(EncodeFlags::SWAP_RG) {
                bytes.copy_from_slice(&[pixel.g, pixel.r, pixel.b]);
            } else {
                bytes.copy_from_slice(&[pixel.r, pixel.g, pixel.b]);
            }
        }
    }
}

/// Decode a wire payload back into a producer-view frame.
///
/// Zero substitution cannot be undone: channels sent as 1 stay 1.
pub fn decode_frame(bytes: &[u8; FRAME_BYTES], flags: EncodeFlags) -> FrameBuffer {
    let mut frame = FrameBuffer::new();
    let pixels = frame.pixels_mut();

    for (i, chunk) in bytes.chunks_exact(3).enumerate() {
        pixels[i] = if flags.contains(EncodeFlags::SWAP_RG) {
            Rgb::new(chunk[1], chunk[0], chunk[2])
        } else {
            Rgb::new(chunk[0], chunk[1], chunk[2])
        };
    }

    if flags.contains(EncodeFlags::ZIGZAG) {
        zigzag(&mut frame);
    }
    frame
}
