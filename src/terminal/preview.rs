//! `TerminalPreview`: draws frames in the terminal instead of on LEDs.
//!
//! Each LED becomes two true-color cells, so the 16x16 matrix shows up as
//! a square. A frame is assembled into one buffer and flushed with a single
//! write to avoid flicker.

use crate::actor::Effect;
use crate::buffer::{FrameBuffer, Rgb, HEIGHT, PIXEL_COUNT, WIDTH};
use crate::error::Result;
use crate::link::FrameSink;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor};
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Characters per LED.
const CELL: &str = "  ";
const SELF_TEST_COLORS: [Rgb; 3] = [Rgb::RED, Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)];
const SELF_TEST_HOLD: Duration = Duration::from_millis(300);

/// Frame sink that renders into a terminal.
pub struct TerminalPreview<W: Write> {
    out: W,
    /// Reused frame assembly buffer.
    output: Vec<u8>,
    /// Top-left corner of the matrix on screen.
    origin: (u16, u16),
    /// Device brightness emulation, 0-255.
    brightness: u8,
    /// Whether we switched to the alternate screen and must switch back.
    alternate: bool,
}

impl TerminalPreview<Stdout> {
    /// Preview on stdout, in the alternate screen.
    pub fn stdout() -> Result<Self> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        let mut preview = Self::new(out);
        preview.alternate = true;
        Ok(preview)
    }
}

impl<W: Write> TerminalPreview<W> {
    /// Preview into any writer, drawing at the top-left corner.
    pub fn new(out: W) -> Self {
        Self {
            out,
            output: Vec::with_capacity(PIXEL_COUNT * 24),
            origin: (0, 0),
            brightness: u8::MAX,
            alternate: false,
        }
    }

    /// Draw the matrix at another position.
    #[must_use]
    pub fn at(mut self, column: u16, row: u16) -> Self {
        self.origin = (column, row);
        self
    }

    /// Render one frame.
    pub fn draw(&mut self, frame: &FrameBuffer) -> io::Result<()> {
        self.output.clear();
        let (x0, y0) = self.origin;

        for (y, row) in frame.rows().enumerate() {
            queue!(self.output, MoveTo(x0, y0 + y as u16))?;
            for &pixel in row {
                let Rgb { r, g, b } = self.dim(pixel);
                queue!(self.output, SetBackgroundColor(Color::Rgb { r, g, b }), Print(CELL))?;
            }
        }
        queue!(self.output, ResetColor)?;

        self.out.write_all(&self.output)?;
        self.out.flush()
    }

    fn dim(&self, pixel: Rgb) -> Rgb {
        pixel.scale(self.brightness)
    }
}

impl<W: Write + Send> FrameSink for TerminalPreview<W> {
    fn present(&mut self, frame: &FrameBuffer) -> Result<usize> {
        self.draw(frame)?;
        Ok(self.output.len())
    }

    fn apply(&mut self, effect: Effect) -> Result<()> {
        debug!(?effect, "preview effect");
        match effect {
            Effect::Brightness(level) => self.brightness = level,
            Effect::Blank => self.draw(&FrameBuffer::filled(Rgb::BLACK))?,
            Effect::SelfTest => {
                for color in SELF_TEST_COLORS {
                    self.draw(&FrameBuffer::filled(color))?;
                    thread::sleep(SELF_TEST_HOLD);
                }
                self.draw(&FrameBuffer::filled(Rgb::BLACK))?;
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.draw(&FrameBuffer::filled(Rgb::BLACK))?;
        if self.alternate {
            execute!(self.out, Show, LeaveAlternateScreen)?;
            self.alternate = false;
        } else {
            queue!(self.out, MoveTo(0, self.origin.1 + HEIGHT as u16), Print("\n"))?;
            self.out.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> Drop for TerminalPreview<W> {
    fn drop(&mut self) {
        if self.alternate {
            let _ = execute!(self.out, Show, LeaveAlternateScreen);
        }
    }
}

impl<W: Write> std::fmt::Debug for TerminalPreview<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalPreview")
            .field("origin", &self.origin)
            .field("brightness", &self.brightness)
            .field("size", &(WIDTH * CELL.len(), HEIGHT))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(f: impl FnOnce(&mut TerminalPreview<&mut Vec<u8>>)) -> String {
        let mut out = Vec::new();
        {
            let mut preview = TerminalPreview::new(&mut out);
            f(&mut preview);
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_draw_uses_true_color() {
        let text = rendered(|p| {
            let mut frame = FrameBuffer::filled(Rgb::BLACK);
            frame.set(3, 2, Rgb::new(255, 10, 0));
            p.draw(&frame).unwrap();
        });
        assert!(text.contains("\x1b[48;2;255;10;0m"));
        assert_eq!(text.matches(CELL).count(), PIXEL_COUNT);
    }

    #[test]
    fn test_brightness_dims_later_frames() {
        let text = rendered(|p| {
            p.apply(Effect::Brightness(128)).unwrap();
            p.present(&FrameBuffer::filled(Rgb::WHITE)).unwrap();
        });
        assert!(text.contains("\x1b[48;2;128;128;128m"));
        assert!(!text.contains("\x1b[48;2;255;255;255m"));
    }

    #[test]
    fn test_faded_pixels_keep_their_level() {
        let text = rendered(|p| {
            let mut frame = FrameBuffer::filled(Rgb::BLACK);
            frame.set(0, 0, Rgb::new(40, 20, 0));
            p.draw(&frame).unwrap();
        });
        assert!(text.contains("\x1b[48;2;40;20;0m"));
    }

    #[test]
    fn test_blank_and_shutdown_draw_black() {
        let text = rendered(|p| {
            p.apply(Effect::Blank).unwrap();
            p.shutdown().unwrap();
        });
        assert!(text.contains("\x1b[48;2;0;0;0m"));
    }

    #[test]
    fn test_origin_offsets_rows() {
        let text = rendered(|p| {
            let mut preview = TerminalPreview::new(Vec::new()).at(4, 2);
            preview.draw(&FrameBuffer::filled(Rgb::BLACK)).unwrap();
            // MoveTo is 1-based on the wire
            assert!(String::from_utf8_lossy(&preview.output).contains("\x1b[3;5H"));
            p.draw(&FrameBuffer::filled(Rgb::BLACK)).unwrap();
        });
        assert!(text.contains("\x1b[1;1H"));
    }
}
