//! Transmit Actor: Dedicated thread that owns the device link.
//!
//! This actor is the only writer of the [`FrameSink`]. It wakes on the
//! frame slot's signal, snapshots the ready frame and pushes it through the
//! sink. Effects arrive on the command channel and are applied between
//! frames, so a command never interleaves with a frame in flight.
//!
//! Any fatal error stops the loop: the actor blanks and disconnects (best
//! effort), cancels the shared token so every producer winds down, and
//! hands the error back from [`TransmitActor::join`].

use super::messages::{Effect, TransmitCommand};
use super::slot::{CancelToken, FrameSlot};
use crate::buffer::FrameBuffer;
use crate::error::{Error, Result};
use crate::link::FrameSink;
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How often an idle loop rechecks the cancel token.
const IDLE_POLL: Duration = Duration::from_millis(16);

/// Transmission statistics.
#[derive(Debug, Clone, Default)]
pub struct TransmitStats {
    /// Frames sent.
    pub frames: u64,
    /// Effects applied.
    pub effects: u64,
    /// Payload bytes written.
    pub bytes_written: u64,
    /// Average frame exchange time in microseconds.
    pub avg_transmit_us: u64,
    /// Last frame exchange time in microseconds.
    pub last_transmit_us: u64,
}

impl TransmitStats {
    fn record_frame(&mut self, bytes: usize, elapsed: Duration) {
        self.frames += 1;
        self.bytes_written += bytes as u64;
        self.last_transmit_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);

        // Smoothed average
        if self.avg_transmit_us == 0 {
            self.avg_transmit_us = self.last_transmit_us;
        } else {
            self.avg_transmit_us = (self.avg_transmit_us * 15 + self.last_transmit_us) / 16;
        }
    }
}

/// Background frame transmitter.
pub struct TransmitActor {
    handle: Option<JoinHandle<Result<TransmitStats>>>,
    commands: Sender<TransmitCommand>,
}

impl TransmitActor {
    /// Spawn the transmit thread.
    ///
    /// `sink` must already be connected. `cancel` is cancelled by the actor
    /// when it fails, and stops the actor when cancelled from outside.
    ///
    /// # Panics
    ///
    /// Panics if the OS fails to spawn the transmit thread.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn<S>(sink: S, slot: FrameSlot, cancel: CancelToken) -> Self
    where
        S: FrameSink + 'static,
    {
        let (commands, command_rx) = unbounded();

        let handle = thread::Builder::new()
            .name("superled-transmit".to_string())
            .spawn(move || {
                let mut transmitter = Transmitter {
                    sink,
                    slot,
                    stats: TransmitStats::default(),
                };
                let result = transmitter.run_loop(&command_rx, &cancel);
                transmitter.finish(result, &cancel)
            })
            .expect("Failed to spawn transmit thread");

        Self {
            handle: Some(handle),
            commands,
        }
    }

    /// Apply an effect between frames, blocking until the device is done.
    pub fn apply(&self, effect: Effect) -> Result<()> {
        let (reply, outcome) = bounded(1);
        self.commands
            .send(TransmitCommand::Effect { effect, reply })
            .map_err(|_| Error::TransmitStopped)?;
        outcome.recv().map_err(|_| Error::TransmitStopped)?
    }

    /// Ask the thread to blank, disconnect and stop.
    pub fn shutdown(&self) {
        let _ = self.commands.send(TransmitCommand::Shutdown);
    }

    /// Whether the thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the thread to exit.
    ///
    /// Returns the statistics of a clean stop, or the error that ended it.
    pub fn join(mut self) -> Result<TransmitStats> {
        let handle = self.handle.take().ok_or(Error::TransmitStopped)?;
        handle.join().map_err(|_| Error::TransmitStopped)?
    }
}

impl Drop for TransmitActor {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

struct Transmitter<S> {
    sink: S,
    slot: FrameSlot,
    stats: TransmitStats,
}

impl<S: FrameSink> Transmitter<S> {
    fn run_loop(&mut self, commands: &Receiver<TransmitCommand>, cancel: &CancelToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                debug!("transmit loop cancelled");
                return Ok(());
            }

            select! {
                recv(self.slot.signal()) -> _ => {
                    if let Some(frame) = self.slot.take() {
                        self.present(&frame)?;
                    }
                }
                recv(commands) -> command => match command {
                    Ok(TransmitCommand::Effect { effect, reply }) => {
                        let result = self.apply(effect);
                        if result.as_ref().is_err_and(Error::is_fatal) {
                            let _ = reply.send(Err(Error::TransmitStopped));
                            return result;
                        }
                        let _ = reply.send(result);
                    }
                    Ok(TransmitCommand::Shutdown) | Err(_) => return Ok(()),
                },
                default(IDLE_POLL) => {}
            }
        }
    }

    fn present(&mut self, frame: &FrameBuffer) -> Result<()> {
        let start = Instant::now();
        let bytes = self.sink.present(frame)?;
        self.stats.record_frame(bytes, start.elapsed());
        debug!(
            updates = self.stats.frames,
            micros = self.stats.last_transmit_us,
            "frame transmitted"
        );
        Ok(())
    }

    fn apply(&mut self, effect: Effect) -> Result<()> {
        info!(?effect, "applying effect");
        self.sink.apply(effect)?;
        self.stats.effects += 1;
        Ok(())
    }

    /// Blank and disconnect, then report how the loop ended.
    fn finish(mut self, result: Result<()>, cancel: &CancelToken) -> Result<TransmitStats> {
        if let Err(e) = &result {
            error!(error = %e, "transmit loop failed, blanking display");
        }

        if let Err(e) = self.sink.shutdown() {
            warn!(error = %e, "could not blank and disconnect cleanly");
        }

        // Producers stop once the link is gone
        cancel.cancel();

        result.map(|()| {
            info!(
                frames = self.stats.frames,
                effects = self.stats.effects,
                avg_us = self.stats.avg_transmit_us,
                "transmit loop stopped"
            );
            self.stats
        })
    }
}
