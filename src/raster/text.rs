//! Text rasterizer: string + color into a scrollable [`DisplayBuffer`].

use super::font::{self, GLYPH_BYTES};
use crate::buffer::{DisplayBuffer, Rgb, GLYPH_WIDTH, HEIGHT};
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Glyph drawn for anything outside the font table.
pub const REPLACEMENT: char = '?';

/// Render `text` in `color`, one 16x16 glyph per grapheme.
///
/// A blank glyph is added on both sides so the first glyph can scroll in and
/// the last one can scroll out. The result is `16 * (graphemes + 2)` pixels
/// wide. Every lit pixel is exactly `color`, every other pixel is black.
pub fn render_text(text: &str, color: Rgb) -> DisplayBuffer {
    let glyphs = glyph_sequence(text);
    let mut strip = DisplayBuffer::new(glyphs.len());

    for (block, bits) in glyphs.iter().enumerate() {
        blit_glyph(&mut strip, block, bits, color);
    }

    strip
}

/// Font rows for the padded text.
fn glyph_sequence(text: &str) -> Vec<&'static [u8]> {
    let blank = font::glyph(' ');
    let replacement = font::glyph(REPLACEMENT);

    let mut glyphs = Vec::with_capacity(text.len() + 2);
    glyphs.extend(blank);

    for grapheme in text.graphemes(true) {
        let mut chars = grapheme.chars();
        let found = match (chars.next(), chars.next()) {
            (Some(c), None) => font::glyph(c),
            _ => None,
        };

        match found {
            Some(bits) => glyphs.push(bits),
            None => {
                warn!(grapheme, "no glyph in font table, using replacement");
                glyphs.extend(replacement);
            }
        }
    }

    glyphs.extend(blank);
    glyphs
}

/// Expand one 1-bit glyph into the strip and tint it.
fn blit_glyph(strip: &mut DisplayBuffer, block: usize, bits: &[u8], color: Rgb) {
    debug_assert_eq!(bits.len(), GLYPH_BYTES);
    let x0 = block * GLYPH_WIDTH;

    for y in 0..HEIGHT {
        let row = u16::from_be_bytes([bits[y * 2], bits[y * 2 + 1]]);
        for x in 0..GLYPH_WIDTH {
            let bit = ((row >> (15 - x)) & 1) as u8;
            strip.set(x0 + x, y, Rgb::splat(bit).tint(color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hi_in_red() {
        let strip = render_text("HI", Rgb::RED);
        assert_eq!(strip.glyph_count(), 4);
        assert_eq!(strip.width(), 4 * 16);
        assert_eq!(strip.height(), 16);

        let lit: Vec<_> = strip.pixels().iter().filter(|p| !p.is_black()).collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|p| **p == Rgb::new(255, 0, 0)));
    }

    #[test]
    fn test_padding_blocks_are_blank() {
        let strip = render_text("A", Rgb::WHITE);
        for y in 0..16 {
            for x in (0..16).chain(32..48) {
                assert_eq!(strip.get(x, y), Some(Rgb::BLACK));
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let a = render_text("Scrolling is fun!?!", Rgb::new(100, 10, 5));
        let b = render_text("Scrolling is fun!?!", Rgb::new(100, 10, 5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_string_has_two_blank_glyphs() {
        let strip = render_text("", Rgb::WHITE);
        assert_eq!(strip.glyph_count(), 2);
        assert!(strip.pixels().iter().all(|p| p.is_black()));
    }

    #[test]
    fn test_out_of_table_uses_replacement() {
        let replaced = render_text("é", Rgb::WHITE);
        let question = render_text("?", Rgb::WHITE);
        assert_eq!(replaced, question);

        // A multi-codepoint grapheme is still a single glyph
        let family = render_text("👨‍👩‍👧", Rgb::WHITE);
        assert_eq!(family.glyph_count(), 3);
    }

    #[test]
    fn test_glyph_orientation() {
        // '_' lights the two bottom rows across the middle of the glyph
        let strip = render_text("_", Rgb::WHITE);
        assert_eq!(strip.get(16, 15), Some(Rgb::WHITE));
        assert_eq!(strip.get(31, 14), Some(Rgb::WHITE));
        assert_eq!(strip.get(16, 13), Some(Rgb::BLACK));
    }
}
