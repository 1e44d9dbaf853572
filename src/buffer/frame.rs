//! FrameBuffer: The 16x16 grid of pixels currently shown on the matrix.
//!
//! Pixels are stored in a fixed array in row-major order
//! (`index = y * 16 + x`), exactly as a producer sees the display. The
//! physical zigzag wiring is only applied by the encoder.

use super::pixel::Rgb;

/// Width of the matrix in pixels.
pub const WIDTH: usize = 16;
/// Height of the matrix in pixels.
pub const HEIGHT: usize = 16;
/// Number of pixels in one frame.
pub const PIXEL_COUNT: usize = WIDTH * HEIGHT;

/// The live 256-pixel RGB grid.
///
/// A freshly allocated buffer is *unset*: it has never been written by a
/// producer and must not be transmitted. Any mutation through the public API
/// marks it as set.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Pixel storage (row-major order).
    pixels: [Rgb; PIXEL_COUNT],
    /// Whether a producer wrote this buffer at least once.
    initialized: bool,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Create an unset buffer (all black, not yet initialized).
    pub const fn new() -> Self {
        Self {
            pixels: [Rgb::BLACK; PIXEL_COUNT],
            initialized: false,
        }
    }

    /// Create a set buffer filled with one color.
    pub const fn filled(color: Rgb) -> Self {
        Self {
            pixels: [color; PIXEL_COUNT],
            initialized: true,
        }
    }

    /// Create a set buffer from row-major pixels.
    pub const fn from_pixels(pixels: [Rgb; PIXEL_COUNT]) -> Self {
        Self {
            pixels,
            initialized: true,
        }
    }

    /// Whether a producer has written this buffer.
    #[inline]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Get a reference to the underlying pixel slice.
    #[inline]
    pub const fn pixels(&self) -> &[Rgb; PIXEL_COUNT] {
        &self.pixels
    }

    /// Get a mutable reference to the underlying pixel slice.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [Rgb; PIXEL_COUNT] {
        self.initialized = true;
        &mut self.pixels
    }

    /// Convert (x, y) coordinates to a linear index.
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[inline]
    pub const fn index_of(x: usize, y: usize) -> Option<usize> {
        if x < WIDTH && y < HEIGHT {
            Some(y * WIDTH + x)
        } else {
            None
        }
    }

    /// Convert a linear index to (x, y) coordinates.
    #[inline]
    pub const fn coords_of(index: usize) -> Option<(usize, usize)> {
        if index < PIXEL_COUNT {
            Some((index % WIDTH, index / WIDTH))
        } else {
            None
        }
    }

    /// Get the pixel at (x, y).
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        Self::index_of(x, y).map(|i| self.pixels[i])
    }

    /// Set the pixel at (x, y).
    ///
    /// Returns `false` if coordinates are out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, color: Rgb) -> bool {
        if let Some(idx) = Self::index_of(x, y) {
            self.pixels[idx] = color;
            self.initialized = true;
            true
        } else {
            false
        }
    }

    /// Fill the whole frame with one color.
    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
        self.initialized = true;
    }

    /// Fill the whole frame with black.
    pub fn clear(&mut self) {
        self.fill(Rgb::BLACK);
    }

    /// Fill rows `start..end` with one color.
    pub fn fill_rows(&mut self, start: usize, end: usize, color: Rgb) {
        let end = end.min(HEIGHT);
        if start < end {
            self.pixels[start * WIDTH..end * WIDTH].fill(color);
            self.initialized = true;
        }
    }

    /// Get one row.
    ///
    /// # Panics
    /// Panics if `y >= 16`.
    #[inline]
    pub fn row(&self, y: usize) -> &[Rgb] {
        &self.pixels[y * WIDTH..(y + 1) * WIDTH]
    }

    /// Get one row mutably.
    ///
    /// # Panics
    /// Panics if `y >= 16`.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [Rgb] {
        self.initialized = true;
        &mut self.pixels[y * WIDTH..(y + 1) * WIDTH]
    }

    /// Get an iterator over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        self.pixels.chunks(WIDTH)
    }

    /// Get a mutable iterator over rows.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [Rgb]> {
        self.initialized = true;
        self.pixels.chunks_mut(WIDTH)
    }

    /// Copy content (and the set/unset state) from another buffer.
    pub fn copy_from(&mut self, other: &Self) {
        self.pixels.copy_from_slice(&other.pixels);
        self.initialized = other.initialized;
    }

    /// Swap the contents of two buffers.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Draw a straight line between two points (Bresenham).
    ///
    /// Points falling outside the matrix are skipped.
    pub fn put_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb) {
        for (x, y) in line_points(from, to) {
            if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
                self.set(x, y, color);
            }
        }
    }
}

/// Integer points of the line from `from` to `to`, endpoints included, in drawing order.
pub fn line_points((x1, y1): (i32, i32), (x2, y2): (i32, i32)) -> Vec<(i32, i32)> {
    let dx = (x2 - x1).abs();
    let dy = -(y2 - y1).abs();
    let step_x = if x1 < x2 { 1 } else { -1 };
    let step_y = if y1 < y2 { 1 } else { -1 };

    let mut points = Vec::with_capacity(dx.max(-dy) as usize + 1);
    let (mut x, mut y) = (x1, y1);
    let mut err = dx + dy;

    loop {
        points.push((x, y));
        if x == x2 && y == y2 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += step_x;
        }
        if e2 <= dx {
            err += dx;
            y += step_y;
        }
    }

    points
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.pixels.iter().filter(|p| !p.is_black()).count();
        f.debug_struct("FrameBuffer")
            .field("initialized", &self.initialized)
            .field("lit", &lit)
            .finish()
    }
}
