//! Image rasterizer: 16x16 stills and animations into frames.
//!
//! Decoding is delegated to the `image` crate. Every frame must be exactly
//! 16x16; transparency is composited onto black.

use crate::actor::{CancelToken, FrameHandle};
use crate::buffer::{FrameBuffer, Rgb, HEIGHT, WIDTH};
use crate::error::{Error, Result};
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::io::Reader as ImageReader;
use image::{AnimationDecoder, DynamicImage, ImageFormat, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// One decoded frame and how long it stays on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    /// Pixels, alpha already flattened.
    pub frame: FrameBuffer,
    /// Display duration declared by the file (zero for stills).
    pub delay: Duration,
}

/// A decoded still or animation, ready to be played on the matrix.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    frames: Vec<ImageFrame>,
    animated: bool,
}

impl ImageSequence {
    /// Decode an image file.
    ///
    /// GIFs, APNGs and animated WebPs are decoded frame by frame with their
    /// declared delays; everything else is a single still.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = ImageReader::open(path)?.with_guessed_format()?;

        let frames = match reader.format() {
            Some(ImageFormat::Gif) => {
                let decoder = GifDecoder::new(BufReader::new(File::open(path)?))?;
                Some(decoder.into_frames().collect_frames()?)
            }
            Some(ImageFormat::Png) => {
                let decoder = PngDecoder::new(BufReader::new(File::open(path)?))?;
                if decoder.is_apng() {
                    Some(decoder.apng().into_frames().collect_frames()?)
                } else {
                    None
                }
            }
            Some(ImageFormat::WebP) => {
                let decoder = WebPDecoder::new(BufReader::new(File::open(path)?))?;
                if decoder.has_animation() {
                    Some(decoder.into_frames().collect_frames()?)
                } else {
                    None
                }
            }
            _ => None,
        };

        if let Some(frames) = frames {
            let sequence = Self::from_frames(frames)?;
            info!(path = %path.display(), frames = sequence.len(), "decoded animation");
            return Ok(sequence);
        }

        let image = reader.decode()?;
        debug!(path = %path.display(), "decoded still image");
        Self::from_image(&image)
    }

    /// Build a single-frame sequence from an already decoded image.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let frame = flatten(&image.to_rgba8())?;
        Ok(Self {
            frames: vec![ImageFrame {
                frame,
                delay: Duration::ZERO,
            }],
            animated: false,
        })
    }

    /// Build an animation from decoded frames.
    pub fn from_frames(frames: Vec<image::Frame>) -> Result<Self> {
        let frames = frames
            .into_iter()
            .map(|frame| {
                let (numer, denom) = frame.delay().numer_denom_ms();
                let delay = Duration::from_millis(u64::from(numer / denom.max(1)));
                Ok(ImageFrame {
                    frame: flatten(frame.buffer())?,
                    delay,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            frames,
            animated: true,
        })
    }

    /// Decoded frames in display order.
    pub fn frames(&self) -> &[ImageFrame] {
        &self.frames
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the sequence holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether the source was a multi-frame format.
    pub const fn is_animated(&self) -> bool {
        self.animated
    }

    /// Show every frame once, waiting each frame's delay.
    ///
    /// Each frame replaces the whole frame buffer and is published for
    /// transmission. Playback stops after the last frame, or early when
    /// `cancel` is set.
    pub fn play(&self, handle: &FrameHandle, cancel: &CancelToken) {
        for (index, item) in self.frames.iter().enumerate() {
            if cancel.is_cancelled() {
                return;
            }
            handle.publish(item.frame.clone());

            if self.animated && !cancel.sleep(item.delay) {
                debug!(index, "animation cancelled");
                return;
            }
        }
    }
}

/// Composite RGBA onto black and copy into a frame.
fn flatten(rgba: &RgbaImage) -> Result<FrameBuffer> {
    let (width, height) = rgba.dimensions();
    if width as usize != WIDTH || height as usize != HEIGHT {
        return Err(Error::ImageSize { width, height });
    }

    let mut frame = FrameBuffer::new();
    for (dst, src) in frame.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = Rgb::new(over_black(r, a), over_black(g, a), over_black(b, a));
    }
    Ok(frame)
}

#[inline]
fn over_black(channel: u8, alpha: u8) -> u8 {
    ((u16::from(channel) * u16::from(alpha)) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Delay, Frame, Rgba};

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(16, 16, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn test_transparent_pixel_becomes_black() {
        let mut img = checker();
        img.put_pixel(0, 0, Rgba([200, 150, 100, 0]));

        let seq = ImageSequence::from_image(&DynamicImage::ImageRgba8(img)).unwrap();
        let frame = &seq.frames()[0].frame;
        assert_eq!(frame.get(0, 0), Some(Rgb::new(0, 0, 0)));
        assert_eq!(frame.get(1, 0), Some(Rgb::new(0, 0, 255)));
    }

    #[test]
    fn test_half_alpha_is_darkened() {
        let mut img = checker();
        img.put_pixel(0, 0, Rgba([255, 255, 255, 128]));
        let seq = ImageSequence::from_image(&DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(seq.frames()[0].frame.get(0, 0), Some(Rgb::splat(128)));
    }

    #[test]
    fn test_rejects_wrong_size() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(8, 16));
        let err = ImageSequence::from_image(&img).unwrap_err();
        assert!(matches!(err, Error::ImageSize { width: 8, height: 16 }));
    }

    #[test]
    fn test_frames_keep_delay() {
        let frames = vec![
            Frame::from_parts(checker(), 0, 0, Delay::from_numer_denom_ms(100, 1)),
            Frame::from_parts(RgbaImage::new(16, 16), 0, 0, Delay::from_numer_denom_ms(50, 1)),
        ];
        let seq = ImageSequence::from_frames(frames).unwrap();
        assert!(seq.is_animated());
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.frames()[0].delay, Duration::from_millis(100));
        assert_eq!(seq.frames()[1].delay, Duration::from_millis(50));
        assert!(seq.frames()[1].frame.pixels().iter().all(|p| p.is_black()));
    }

    #[test]
    fn test_open_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");
        checker().save(&path).unwrap();

        let seq = ImageSequence::open(&path).unwrap();
        assert!(!seq.is_animated());
        assert_eq!(seq.frames()[0].frame.get(0, 0), Some(Rgb::RED));
    }

    #[test]
    fn test_open_animated_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blink.png");
        let solid = |rgba: [u8; 4]| rgba.repeat(WIDTH * HEIGHT);

        let mut encoder = png::Encoder::new(File::create(&path).unwrap(), 16, 16);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_animated(2, 0).unwrap();
        encoder.set_frame_delay(1, 10).unwrap();
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&solid([255, 0, 0, 255])).unwrap();
        writer.write_image_data(&solid([0, 0, 255, 255])).unwrap();
        writer.finish().unwrap();

        let seq = ImageSequence::open(&path).unwrap();
        assert!(seq.is_animated());
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.frames()[0].delay, Duration::from_millis(100));
        assert_eq!(seq.frames()[0].frame.get(0, 0), Some(Rgb::RED));
        assert_eq!(seq.frames()[1].frame.get(15, 15), Some(Rgb::new(0, 0, 255)));
    }

    #[test]
    fn test_open_missing_file() {
        let err = ImageSequence::open("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_play_publishes_every_frame() {
        let slot = crate::actor::FrameSlot::new();
        let handle = slot.handle();
        let seq = ImageSequence::from_image(&DynamicImage::ImageRgba8(checker())).unwrap();

        seq.play(&handle, &CancelToken::new());
        let shown = slot.take().unwrap();
        assert_eq!(shown.get(0, 0), Some(Rgb::RED));
        assert!(slot.take().is_none());
    }
}
