//! Display: the entry point for applications using superled.
//!
//! A `Display` owns the shared frame slot, the cancellation tokens and the
//! transmit actor. Producer methods (`scroll_text`, `show_image`, `run_clock`
//! and friends) run on the calling thread and publish frames; the transmit
//! thread sends them.
//!
//! ```no_run
//! use superled::{Config, Display, Rgb};
//!
//! let config = Config::load("superled.toml")?;
//! let display = Display::connect(&config)?;
//! display.scroll_text("Hello!", Rgb::new(255, 64, 0))?;
//! display.shutdown()?;
//! # Ok::<(), superled::Error>(())
//! ```

use crate::actor::{CancelToken, Effect, FrameHandle, FrameSlot, TransmitActor, TransmitStats};
use crate::buffer::{FrameBuffer, Rgb};
use crate::config::{Config, LinkKind};
use crate::error::{Error, Result};
use crate::link::{FrameSink, Link, Protocol, SerialTransport, TcpTransport};
use crate::raster::{render_text, ClockFace, ImageSequence};
use crate::scroll::{ScrollSpeed, Scroller};
use crate::terminal::TerminalPreview;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const STILL_POLL: Duration = Duration::from_millis(250);

/// How an image is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageOptions {
    /// Set device brightness before the first frame.
    pub brightness: Option<u8>,
    /// Loop until cancelled instead of playing once.
    pub repeat: bool,
}

/// A connected display and its transmit thread.
pub struct Display {
    handle: FrameHandle,
    /// Cancelled when the transmit loop dies; stops everything.
    abort: CancelToken,
    /// Cancelled to stop producers while keeping the link up.
    jobs: CancelToken,
    transmitter: Option<TransmitActor>,
    speed: ScrollSpeed,
    antialias: bool,
}

impl Display {
    /// Open the device described by `config` and start transmitting.
    ///
    /// Serial devices reset when the port opens; this waits the configured
    /// startup delay, then performs the handshake.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let link = &config.link;
        let abort = CancelToken::new();

        let sink: Box<dyn FrameSink> = match link.kind {
            LinkKind::Serial => {
                let transport = SerialTransport::open(&link.port, link.baud, link.poll_interval())?;
                if !abort.sleep(link.startup_delay()) {
                    return Err(Error::Cancelled);
                }
                let mut device = Link::new(transport, Protocol::Serial, link.timeouts(), abort.clone());
                device.handshake()?;
                Box::new(device)
            }
            LinkKind::Tcp => {
                let transport =
                    TcpTransport::connect(&link.address, link.connect_timeout(), link.poll_interval())?;
                let mut device = Link::new(transport, Protocol::Socket, link.timeouts(), abort.clone());
                device.handshake()?;
                Box::new(device)
            }
            LinkKind::Preview => Box::new(TerminalPreview::stdout()?),
        };

        info!(kind = ?link.kind, "display connected");
        Self::with_sink(sink, config, abort)
    }

    /// Start transmitting to an already prepared sink.
    ///
    /// `abort` must be the token the sink checks, if it checks one.
    pub fn with_sink<S>(sink: S, config: &Config, abort: CancelToken) -> Result<Self>
    where
        S: FrameSink + 'static,
    {
        let slot = FrameSlot::new();
        let handle = slot.handle();
        let transmitter = TransmitActor::spawn(sink, slot, abort.clone());

        Ok(Self {
            handle,
            jobs: abort.child(),
            abort,
            transmitter: Some(transmitter),
            speed: config.scroll_speed()?,
            antialias: config.scroll.antialias,
        })
    }

    /// Producer handle onto the shared frame.
    pub fn handle(&self) -> FrameHandle {
        self.handle.clone()
    }

    /// Token that stops running producers (and refuses new ones) but keeps
    /// the link open for a clean shutdown.
    pub fn stop_token(&self) -> CancelToken {
        self.jobs.clone()
    }

    /// Override the configured scroll speed.
    pub fn set_scroll_speed(&mut self, speed: ScrollSpeed) {
        self.speed = speed;
    }

    /// Turn anti-aliased scrolling on or off.
    pub fn set_antialias(&mut self, antialias: bool) {
        self.antialias = antialias;
    }

    /// Whether the transmit loop is still running.
    pub fn is_alive(&self) -> bool {
        !self.abort.is_cancelled()
            && self.transmitter.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Show one frame.
    pub fn show_frame(&self, frame: FrameBuffer) -> Result<()> {
        self.ensure_alive()?;
        self.handle.publish(frame);
        Ok(())
    }

    /// Scroll `text` in `color` until stopped.
    pub fn scroll_text(&self, text: &str, color: Rgb) -> Result<()> {
        self.ensure_alive()?;
        let strip = render_text(text, color);
        info!(text, glyphs = strip.glyph_count(), "scrolling text");
        Scroller::new(strip, self.speed, self.antialias).run(&self.handle, &self.jobs);
        self.ensure_alive()
    }

    /// Play one image file.
    ///
    /// Any content error (missing file, wrong size) is returned.
    pub fn show_image(&self, path: impl AsRef<Path>, options: ImageOptions) -> Result<()> {
        self.ensure_alive()?;
        let sequence = ImageSequence::open(path)?;
        self.play_sequence(&sequence, options)
    }

    /// Play image files in order, skipping those that cannot be shown.
    ///
    /// With `options.repeat` the whole batch loops until stopped.
    pub fn show_images<P: AsRef<Path>>(&self, paths: &[P], options: ImageOptions) -> Result<()> {
        self.ensure_alive()?;
        let sequences: Vec<ImageSequence> = paths
            .iter()
            .filter_map(|path| match ImageSequence::open(path) {
                Ok(sequence) if sequence.is_empty() => {
                    warn!(path = %path.as_ref().display(), "skipping image without frames");
                    None
                }
                Ok(sequence) => Some(sequence),
                Err(e) => {
                    warn!(path = %path.as_ref().display(), error = %e, "skipping image");
                    None
                }
            })
            .collect();

        if let Some(level) = options.brightness {
            self.effect(Effect::Brightness(level))?;
        }

        let once = ImageOptions {
            brightness: None,
            repeat: false,
        };
        loop {
            for sequence in &sequences {
                self.play_sequence(sequence, once)?;
                if self.jobs.is_cancelled() {
                    return self.ensure_alive();
                }
            }
            if !options.repeat || sequences.is_empty() {
                return self.ensure_alive();
            }
            if !sequences.iter().any(ImageSequence::is_animated) {
                while self.jobs.sleep(STILL_POLL) {}
                return self.ensure_alive();
            }
        }
    }

    /// Play an already decoded image.
    pub fn play_sequence(&self, sequence: &ImageSequence, options: ImageOptions) -> Result<()> {
        if let Some(level) = options.brightness {
            self.effect(Effect::Brightness(level))?;
        }
        loop {
            sequence.play(&self.handle, &self.jobs);
            if !options.repeat || self.jobs.is_cancelled() || sequence.is_empty() {
                break;
            }
            // A still only needs showing once
            if !sequence.is_animated() {
                while self.jobs.sleep(STILL_POLL) {}
                break;
            }
        }
        self.ensure_alive()
    }

    /// Show the clock until stopped.
    pub fn run_clock(&self, color: Rgb) -> Result<()> {
        self.ensure_alive()?;
        ClockFace::new(color).run(&self.handle, &self.jobs);
        self.ensure_alive()
    }

    /// Apply a device effect, blocking until it is done.
    ///
    /// A frame that is ready but not yet sent is dropped first.
    pub fn effect(&self, effect: Effect) -> Result<()> {
        let transmitter = self.transmitter.as_ref().ok_or(Error::TransmitStopped)?;
        self.handle.withdraw();
        transmitter.apply(effect)
    }

    /// Set device brightness.
    pub fn set_brightness(&self, level: u8) -> Result<()> {
        self.effect(Effect::Brightness(level))
    }

    /// Run the device self-test.
    pub fn self_test(&self) -> Result<()> {
        self.effect(Effect::SelfTest)
    }

    /// Turn every LED off.
    pub fn blank(&self) -> Result<()> {
        self.effect(Effect::Blank)
    }

    /// Block until the transmit loop stops on its own (failure or abort).
    pub fn wait(mut self) -> Result<TransmitStats> {
        self.transmitter.take().ok_or(Error::TransmitStopped)?.join()
    }

    /// Stop producers, blank, disconnect and wait for the transmit thread.
    ///
    /// Returns the error that ended the transmit loop, if any.
    pub fn shutdown(mut self) -> Result<TransmitStats> {
        self.jobs.cancel();
        let transmitter = self.transmitter.take().ok_or(Error::TransmitStopped)?;
        transmitter.shutdown();
        transmitter.join()
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.abort.is_cancelled() {
            Err(Error::TransmitStopped)
        } else {
            Ok(())
        }
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        self.jobs.cancel();
        if let Some(transmitter) = self.transmitter.take() {
            transmitter.shutdown();
            let _ = transmitter.join();
        }
    }
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("alive", &self.is_alive())
            .field("speed", &self.speed)
            .field("antialias", &self.antialias)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    #[derive(Clone, Default)]
    struct Recorder {
        frames: Arc<Mutex<Vec<FrameBuffer>>>,
        effects: Arc<Mutex<Vec<Effect>>>,
        fail_frames: bool,
    }

    impl FrameSink for Recorder {
        fn present(&mut self, frame: &FrameBuffer) -> Result<usize> {
            if self.fail_frames {
                return Err(Error::Timeout { expected: 'A' });
            }
            self.frames.lock().unwrap().push(frame.clone());
            Ok(0)
        }

        fn apply(&mut self, effect: Effect) -> Result<()> {
            self.effects.lock().unwrap().push(effect);
            Ok(())
        }

        fn shutdown(&mut self) -> Result<()> {
            self.effects.lock().unwrap().push(Effect::Blank);
            Ok(())
        }
    }

    fn display(sink: &Recorder) -> Display {
        Display::with_sink(sink.clone(), &Config::default(), CancelToken::new()).unwrap()
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_show_frame_reaches_sink() {
        let sink = Recorder::default();
        let display = display(&sink);
        display.show_frame(FrameBuffer::filled(Rgb::RED)).unwrap();
        wait_for(|| !sink.frames.lock().unwrap().is_empty());

        let stats = display.shutdown().unwrap();
        assert_eq!(stats.frames, 1);
        assert_eq!(sink.effects.lock().unwrap().as_slice(), &[Effect::Blank]);
    }

    #[test]
    fn test_effects_go_through_transmitter() {
        let sink = Recorder::default();
        let display = display(&sink);
        display.set_brightness(40).unwrap();
        display.self_test().unwrap();
        assert_eq!(
            sink.effects.lock().unwrap().as_slice(),
            &[Effect::Brightness(40), Effect::SelfTest]
        );
        display.shutdown().unwrap();
    }

    #[test]
    fn test_stop_token_ends_scroll() {
        let sink = Recorder::default();
        let display = display(&sink);
        let stop = display.stop_token();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stop.cancel();
        });
        display.scroll_text("Hi", Rgb::WHITE).unwrap();
        stopper.join().unwrap();

        assert!(!sink.frames.lock().unwrap().is_empty());
        display.shutdown().unwrap();
    }

    #[test]
    fn test_transmit_failure_stops_producers() {
        let sink = Recorder {
            fail_frames: true,
            ..Recorder::default()
        };
        let display = display(&sink);

        let err = display.scroll_text("fail", Rgb::WHITE).unwrap_err();
        assert!(matches!(err, Error::TransmitStopped));
        assert!(!display.is_alive());
        assert!(matches!(display.shutdown(), Err(Error::Timeout { expected: 'A' })));
    }

    #[test]
    fn test_batch_skips_bad_images() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let wrong_size = dir.path().join("big.png");
        let missing = dir.path().join("missing.png");
        RgbaImage::from_pixel(16, 16, Rgba([0, 0, 255, 255])).save(&good).unwrap();
        RgbaImage::new(32, 32).save(&wrong_size).unwrap();

        let sink = Recorder::default();
        let display = display(&sink);
        display
            .show_images(&[&missing, &wrong_size, &good], ImageOptions::default())
            .unwrap();
        wait_for(|| !sink.frames.lock().unwrap().is_empty());

        let frames = sink.frames.lock().unwrap().clone();
        assert_eq!(frames.last().unwrap().get(0, 0), Some(Rgb::new(0, 0, 255)));
        display.shutdown().unwrap();
    }

    #[test]
    fn test_repeat_of_empty_animation_returns() {
        let sink = Recorder::default();
        let display = Arc::new(display(&sink));
        let empty = ImageSequence::from_frames(Vec::new()).unwrap();
        assert!(empty.is_empty());

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let player = Arc::clone(&display);
        thread::spawn(move || {
            let options = ImageOptions {
                brightness: None,
                repeat: true,
            };
            done_tx.send(player.play_sequence(&empty, options)).unwrap();
        });

        let outcome = done_rx.recv_timeout(Duration::from_secs(2));
        display.stop_token().cancel();
        assert!(matches!(outcome, Ok(Ok(()))));
        assert!(sink.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_single_image_error_is_returned() {
        let sink = Recorder::default();
        let display = display(&sink);
        let err = display
            .show_image("/no/such/image.gif", ImageOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(display.is_alive());
        display.shutdown().unwrap();
    }
}
