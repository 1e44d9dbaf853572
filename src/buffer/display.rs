//! DisplayBuffer: A wide pixel strip used as the scroll source.
//!
//! Rendered text is laid out as one 16x16 block per glyph, side by side, so the
//! strip is `16 * glyphs` pixels wide and 16 pixels tall. It is built once per
//! scroll session and only read afterwards.

use super::frame::HEIGHT;
use super::pixel::Rgb;

/// Width of one glyph block in pixels.
pub const GLYPH_WIDTH: usize = 16;

/// Row-major strip of `16 * glyphs` by 16 pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct DisplayBuffer {
    /// Contiguous pixel storage (row-major order).
    pixels: Vec<Rgb>,
    /// Number of 16-pixel glyph blocks across.
    glyphs: usize,
}

impl DisplayBuffer {
    /// Create a black strip `glyphs` blocks wide.
    pub fn new(glyphs: usize) -> Self {
        Self {
            pixels: vec![Rgb::BLACK; glyphs * GLYPH_WIDTH * HEIGHT],
            glyphs,
        }
    }

    /// Wrap existing row-major pixels.
    ///
    /// Returns `None` unless `pixels.len() == 16 * 16 * glyphs`.
    pub fn from_pixels(pixels: Vec<Rgb>, glyphs: usize) -> Option<Self> {
        (pixels.len() == glyphs * GLYPH_WIDTH * HEIGHT).then_some(Self { pixels, glyphs })
    }

    /// Number of glyph blocks.
    #[inline]
    pub const fn glyph_count(&self) -> usize {
        self.glyphs
    }

    /// Width in pixels (`16 * glyph_count`).
    #[inline]
    pub const fn width(&self) -> usize {
        self.glyphs * GLYPH_WIDTH
    }

    /// Height in pixels (always 16).
    #[inline]
    pub const fn height(&self) -> usize {
        HEIGHT
    }

    /// Total number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the strip holds no glyphs.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Row-major pixel slice.
    #[inline]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Get the pixel at (x, y).
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        (x < self.width() && y < HEIGHT).then(|| self.pixels[y * self.width() + x])
    }

    /// Set the pixel at (x, y). Returns `false` if out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, color: Rgb) -> bool {
        if x < self.width() && y < HEIGHT {
            let width = self.width();
            self.pixels[y * width + x] = color;
            true
        } else {
            false
        }
    }

    /// Get one full-width row.
    ///
    /// # Panics
    /// Panics if `y >= 16`.
    #[inline]
    pub fn row(&self, y: usize) -> &[Rgb] {
        let width = self.width();
        &self.pixels[y * width..(y + 1) * width]
    }

    /// The 16-pixel window of row `y` starting at column `offset`.
    ///
    /// Returns `None` when the window runs past the right edge.
    pub fn window(&self, y: usize, offset: usize) -> Option<&[Rgb]> {
        if y >= HEIGHT || offset + GLYPH_WIDTH > self.width() {
            return None;
        }
        let start = y * self.width() + offset;
        Some(&self.pixels[start..start + GLYPH_WIDTH])
    }
}

impl std::fmt::Debug for DisplayBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayBuffer")
            .field("glyphs", &self.glyphs)
            .field("width", &self.width())
            .finish()
    }
}
