//! Sub-pixel smoothing for a monochrome scroll.
//!
//! Between two whole-pixel positions the scroller shows [`STEPS`]
//! intermediate frames. In each, a lit pixel with a dark right neighbour
//! fades out and a dark pixel with a lit right neighbour fades in, so the
//! text appears to glide left. Only one foreground color is supported.

use crate::buffer::{FrameBuffer, Rgb, HEIGHT, WIDTH};
use crate::color::{brightness, with_brightness};

/// Intermediate frames per whole-pixel step.
pub const STEPS: usize = 10;

/// Foreground color of a monochrome frame: the last non-black pixel.
pub fn foreground(frame: &FrameBuffer) -> Option<Rgb> {
    frame.pixels().iter().rev().copied().find(|p| !p.is_black())
}

/// Apply blend step `step` (0-based, `< STEPS`) to `working`.
///
/// Conditions are read from `original`, the frame as it was before the
/// first step, and results are written to `working`. The last column has
/// no right neighbour and is left alone. An all-black frame is unchanged.
pub fn antialias_step(working: &mut FrameBuffer, original: &FrameBuffer, step: usize) {
    let Some(color) = foreground(original) else {
        return;
    };

    let full = brightness(color);
    let ratio = (step + 1) as f64 / STEPS as f64;
    let fading_in = with_brightness(color, full * ratio);
    let fading_out = with_brightness(color, full * (1.0 - ratio));

    for y in 0..HEIGHT {
        let row = original.row(y);
        for x in 0..WIDTH - 1 {
            let (current, right) = (row[x], row[x + 1]);
            if current.is_black() && right == color {
                working.set(x, y, fading_in);
            } else if current == color && right.is_black() {
                working.set(x, y, fading_out);
            }
        }
    }
}
