//! Rgb: The atomic unit of the LED matrix.
//!
//! One `Rgb` is one physical LED. The struct is exactly 3 bytes so a full
//! frame of 256 pixels is 768 bytes in memory, the same size as on the wire.

use std::fmt;
use std::str::FromStr;

/// True-color RGB representation.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
}

const _: () = assert!(std::mem::size_of::<Rgb>() == 3, "Rgb must stay 3 bytes");

impl Rgb {
    /// Create a new RGB color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Black (0, 0, 0), an unlit LED.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// White (255, 255, 255)
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Red (255, 0, 0)
    pub const RED: Self = Self::new(255, 0, 0);

    /// Create from a 24-bit hex color (e.g., 0xFF5500).
    #[inline]
    pub const fn from_u32(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// A pixel lit with the same value on every channel (used for 1-bit glyph expansion).
    #[inline]
    pub const fn splat(value: u8) -> Self {
        Self::new(value, value, value)
    }

    /// Whether all channels are zero.
    #[inline]
    pub const fn is_black(self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }

    /// Channel-wise multiplication, saturating at 255.
    ///
    /// A `{0,1}` mask times a color yields either black or the color.
    #[inline]
    #[must_use]
    pub const fn tint(self, other: Self) -> Self {
        Self::new(
            sat_mul(self.r, other.r),
            sat_mul(self.g, other.g),
            sat_mul(self.b, other.b),
        )
    }

    /// Scale every channel by `level / 255`. Level 255 leaves the color as is.
    #[inline]
    #[must_use]
    pub const fn scale(self, level: u8) -> Self {
        Self::new(
            scale_channel(self.r, level),
            scale_channel(self.g, level),
            scale_channel(self.b, level),
        )
    }

    /// Replace every zero channel with 1. Zero is a control byte on the socket link.
    #[inline]
    #[must_use]
    pub const fn reserve_zero(self) -> Self {
        Self::new(non_zero(self.r), non_zero(self.g), non_zero(self.b))
    }
}

#[inline]
const fn sat_mul(a: u8, b: u8) -> u8 {
    let product = (a as u16) * (b as u16);
    if product > 255 {
        255
    } else {
        product as u8
    }
}

#[inline]
const fn scale_channel(c: u8, level: u8) -> u8 {
    ((c as u16) * (level as u16) / 255) as u8
}

#[inline]
const fn non_zero(c: u8) -> u8 {
    if c == 0 {
        1
    } else {
        c
    }
}

impl fmt::Debug for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    #[inline]
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl From<[u8; 3]> for Rgb {
    #[inline]
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    #[inline]
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

impl From<u32> for Rgb {
    /// Convert from a 24-bit hex color (e.g., 0xFF5500)
    #[inline]
    fn from(hex: u32) -> Self {
        Self::from_u32(hex)
    }
}

/// Error returned when parsing an `Rgb` from text fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRgbError(String);

impl fmt::Display for ParseRgbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color '{}': expected R,G,B or #RRGGBB", self.0)
    }
}

impl std::error::Error for ParseRgbError {}

impl FromStr for Rgb {
    type Err = ParseRgbError;

    /// Parses `"255,128,0"` or `"#ff8000"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseRgbError(s.to_string());

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 {
                return Err(err());
            }
            return u32::from_str_radix(hex, 16).map(Self::from_u32).map_err(|_| err());
        }

        let channels: Vec<u8> = s
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|_| err())?;

        match channels.as_slice() {
            [r, g, b] => Ok(Self::new(*r, *g, *b)),
            _ => Err(err()),
        }
    }
}
