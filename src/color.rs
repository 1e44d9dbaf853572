//! Brightness utilities based on the HLS color model.
//!
//! "Brightness" here is the lightness component of HLS: 0.0 is black, 0.5 is
//! the fully saturated hue, 1.0 is white. Changing it keeps hue and saturation,
//! which is what the anti-aliasing fade needs.

use crate::buffer::Rgb;

/// A color in hue / lightness / saturation form, every component in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hls {
    /// Hue, as a fraction of a full turn.
    pub h: f64,
    /// Lightness.
    pub l: f64,
    /// Saturation.
    pub s: f64,
}

const ONE_THIRD: f64 = 1.0 / 3.0;
const ONE_SIXTH: f64 = 1.0 / 6.0;
const TWO_THIRDS: f64 = 2.0 / 3.0;

impl Hls {
    /// Convert from 8-bit RGB.
    pub fn from_rgb(color: Rgb) -> Self {
        let r = f64::from(color.r) / 255.0;
        let g = f64::from(color.g) / 255.0;
        let b = f64::from(color.b) / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let sum = max + min;
        let range = max - min;
        let l = sum / 2.0;

        if range == 0.0 {
            return Self { h: 0.0, l, s: 0.0 };
        }

        let s = if l <= 0.5 {
            range / sum
        } else {
            range / (2.0 - max - min)
        };

        let rc = (max - r) / range;
        let gc = (max - g) / range;
        let bc = (max - b) / range;

        #[allow(clippy::float_cmp)]
        let h = if r == max {
            bc - gc
        } else if g == max {
            2.0 + rc - bc
        } else {
            4.0 + gc - rc
        };

        Self {
            h: (h / 6.0).rem_euclid(1.0),
            l,
            s,
        }
    }

    /// Convert back to 8-bit RGB. Channels are truncated, not rounded.
    pub fn to_rgb(self) -> Rgb {
        if self.s == 0.0 {
            let v = to_byte(self.l);
            return Rgb::splat(v);
        }

        let m2 = if self.l <= 0.5 {
            self.l * (1.0 + self.s)
        } else {
            self.l + self.s - self.l * self.s
        };
        let m1 = 2.0 * self.l - m2;

        Rgb::new(
            to_byte(hue_channel(m1, m2, self.h + ONE_THIRD)),
            to_byte(hue_channel(m1, m2, self.h)),
            to_byte(hue_channel(m1, m2, self.h - ONE_THIRD)),
        )
    }
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < ONE_SIXTH {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < TWO_THIRDS {
        m1 + (m2 - m1) * (TWO_THIRDS - hue) * 6.0
    } else {
        m1
    }
}

fn to_byte(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

/// Lightness of a color (0.0 - 1.0).
pub fn brightness(color: Rgb) -> f64 {
    Hls::from_rgb(color).l
}

/// The same hue and saturation at the given lightness (clamped to 0.0 - 1.0).
pub fn with_brightness(color: Rgb, brightness: f64) -> Rgb {
    let mut hls = Hls::from_rgb(color);
    hls.l = brightness.clamp(0.0, 1.0);
    hls.to_rgb()
}

/// Scale lightness relative to its current value.
///
/// `change` of -0.5 halves the lightness, +1.0 doubles it (clamped at 1.0).
pub fn adjust_brightness(color: Rgb, change: f64) -> Rgb {
    let mut hls = Hls::from_rgb(color);
    hls.l = (hls.l + change * hls.l).clamp(0.0, 1.0);
    hls.to_rgb()
}
