//! Horizontal text scroller.
//!
//! A [`Scroller`] slides a 16-pixel window across a [`DisplayBuffer`] one
//! column at a time, optionally smoothing each move with
//! [`antialias`] sub-steps. One pass runs from the first glyph to the
//! last; [`Scroller::run`] repeats passes until cancelled.

pub mod antialias;

use crate::actor::{CancelToken, FrameHandle};
use crate::buffer::{DisplayBuffer, FrameBuffer, GLYPH_WIDTH, HEIGHT};
use crate::error::{Error, Result};
use std::ops::Range;
use std::time::Duration;
use tracing::{debug, trace};

pub use antialias::{antialias_step, STEPS};

/// Scroll speed, 1 (slowest) to 10 (fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScrollSpeed(u8);

impl ScrollSpeed {
    /// Slowest accepted speed.
    pub const MIN: u8 = 1;
    /// Fastest accepted speed.
    pub const MAX: u8 = 10;

    /// Validate a speed.
    pub const fn new(speed: u8) -> Result<Self> {
        if speed < Self::MIN || speed > Self::MAX {
            return Err(Error::ScrollSpeed(speed));
        }
        Ok(Self(speed))
    }

    /// The raw speed value.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Pause after each whole-pixel step.
    pub const fn step_delay(self) -> Duration {
        Duration::from_millis((Self::MAX + 1 - self.0) as u64 * 20)
    }

    /// Pause after each anti-aliasing sub-step.
    pub const fn substep_delay(self) -> Duration {
        Duration::from_millis((Self::MAX + 1 - self.0) as u64 * 2)
    }
}

impl Default for ScrollSpeed {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u8> for ScrollSpeed {
    type Error = Error;

    fn try_from(speed: u8) -> Result<Self> {
        Self::new(speed)
    }
}

/// One frame of a scroll pass and how long it stays up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollFrame {
    /// The frame to show.
    pub frame: FrameBuffer,
    /// Pause after showing it.
    pub hold: Duration,
}

/// Scrolls a rendered text strip across the matrix.
#[derive(Debug, Clone)]
pub struct Scroller {
    source: DisplayBuffer,
    speed: ScrollSpeed,
    antialias: bool,
}

impl Scroller {
    /// Scroll `source` at `speed`, with or without sub-pixel smoothing.
    pub const fn new(source: DisplayBuffer, speed: ScrollSpeed, antialias: bool) -> Self {
        Self {
            source,
            speed,
            antialias,
        }
    }

    /// Window offsets of one pass.
    pub fn offsets(&self) -> Range<usize> {
        0..self.source.width().saturating_sub(GLYPH_WIDTH)
    }

    /// The frame showing the window that starts `offset` columns in.
    pub fn frame_at(&self, offset: usize) -> FrameBuffer {
        let mut frame = FrameBuffer::new();
        for y in 0..HEIGHT {
            if let Some(window) = self.source.window(y, offset) {
                frame.row_mut(y).copy_from_slice(window);
            }
        }
        frame
    }

    /// Every frame of one pass, in order, without sleeping.
    ///
    /// Without anti-aliasing there is one frame per offset. With it, each
    /// whole-pixel frame is followed by [`STEPS`] blended frames and the
    /// pause moves to those.
    pub fn pass_frames(&self) -> impl Iterator<Item = ScrollFrame> + '_ {
        self.offsets().flat_map(move |offset| {
            let whole = self.frame_at(offset);
            let blended = if self.antialias {
                self.blend_steps(&whole)
            } else {
                Vec::new()
            };
            let hold = if self.antialias {
                Duration::ZERO
            } else {
                self.speed.step_delay()
            };

            std::iter::once(ScrollFrame { frame: whole, hold }).chain(blended)
        })
    }

    fn blend_steps(&self, original: &FrameBuffer) -> Vec<ScrollFrame> {
        let mut working = original.clone();
        (0..STEPS)
            .map(|step| {
                antialias_step(&mut working, original, step);
                ScrollFrame {
                    frame: working.clone(),
                    hold: self.speed.substep_delay(),
                }
            })
            .collect()
    }

    /// Scroll until `cancel` is set, publishing every frame.
    ///
    /// Cancellation is checked before each pass and during each pause.
    pub fn run(&self, handle: &FrameHandle, cancel: &CancelToken) {
        debug!(
            glyphs = self.source.glyph_count(),
            speed = self.speed.get(),
            antialias = self.antialias,
            "scroll started"
        );

        let mut passes = 0u64;
        while !cancel.is_cancelled() {
            for step in self.pass_frames() {
                handle.publish(step.frame);
                if !cancel.sleep(step.hold) {
                    break;
                }
            }
            passes += 1;
            trace!(passes, "scroll pass complete");

            // A strip narrower than the screen has nothing to animate
            if self.offsets().is_empty() && !cancel.sleep(self.speed.step_delay()) {
                break;
            }
        }

        debug!(passes, "scroll stopped");
    }
}
