//! Digital clock face: `HH MM` over `DD MM` in 3x5 digits.

use super::font::DIGITS_3X5;
use crate::actor::{CancelToken, FrameHandle, TickerActor};
use crate::buffer::{FrameBuffer, Rgb};
use chrono::{Datelike, Local, Timelike};
use crossbeam_channel::RecvTimeoutError;
use std::time::Duration;
use tracing::{debug, trace};

const DIGIT_W: usize = 3;
const DIGIT_H: usize = 5;
/// Left column of each of the four digits in a line.
const DIGIT_COLUMNS: [usize; 4] = [0, 4, 9, 13];
/// Top row of the time line and the date line.
const TIME_ROW: usize = 1;
const DATE_ROW: usize = 9;

/// The clock redraws once per tick.
pub const CLOCK_INTERVAL: Duration = Duration::from_secs(1);

type Digit = [Rgb; DIGIT_W * DIGIT_H];

/// A point in time, as far as the clock face cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// Hour, 0-23.
    pub hour: u32,
    /// Minute, 0-59.
    pub minute: u32,
    /// Day of month, 1-31.
    pub day: u32,
    /// Month, 1-12.
    pub month: u32,
}

impl ClockReading {
    /// Current local wall-clock time.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            hour: now.hour(),
            minute: now.minute(),
            day: now.day(),
            month: now.month(),
        }
    }
}

/// Pre-rendered digits in one color.
#[derive(Debug, Clone)]
pub struct ClockFace {
    digits: [Digit; 10],
}

impl ClockFace {
    /// Build the ten digit glyphs in `color` on black.
    pub fn new(color: Rgb) -> Self {
        let mut digits = [[Rgb::BLACK; DIGIT_W * DIGIT_H]; 10];
        for (n, digit) in digits.iter_mut().enumerate() {
            for (row, bits) in DIGITS_3X5[n * DIGIT_H..(n + 1) * DIGIT_H].iter().enumerate() {
                for col in 0..DIGIT_W {
                    if bits & (0b100 >> col) != 0 {
                        digit[row * DIGIT_W + col] = color;
                    }
                }
            }
        }
        Self { digits }
    }

    /// Lay out `reading` over the whole frame. Every pixel is written.
    pub fn render(&self, frame: &mut FrameBuffer, reading: ClockReading) {
        frame.clear();
        self.draw_pair_line(frame, TIME_ROW, reading.hour, reading.minute);
        self.draw_pair_line(frame, DATE_ROW, reading.day, reading.month);
    }

    /// Redraw the face every second until `cancel` is set.
    ///
    /// Each redraw happens under the frame lock, so a half-drawn face is
    /// never transmitted.
    pub fn run(&self, handle: &FrameHandle, cancel: &CancelToken) {
        let ticker = TickerActor::spawn(CLOCK_INTERVAL, cancel.child());
        debug!("clock started");

        while !cancel.is_cancelled() {
            match ticker.receiver().recv_timeout(Duration::from_millis(100)) {
                Ok(tick) => {
                    let reading = ClockReading::now();
                    trace!(tick = tick.count, ?reading, "clock redraw");
                    handle.update(|frame| self.render(frame, reading));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        ticker.join();
        debug!("clock stopped");
    }

    fn draw_pair_line(&self, frame: &mut FrameBuffer, top: usize, left: u32, right: u32) {
        let digits = [left / 10 % 10, left % 10, right / 10 % 10, right % 10];
        for (&x0, &n) in DIGIT_COLUMNS.iter().zip(&digits) {
            let glyph = &self.digits[n as usize];
            for (row, pixels) in glyph.chunks_exact(DIGIT_W).enumerate() {
                frame.row_mut(top + row)[x0..x0 + DIGIT_W].copy_from_slice(pixels);
            }
        }
    }
}
