//! Ticker Actor: Dedicated thread generating fixed-interval ticks.
//!
//! The first tick fires immediately, so a clock face is drawn as soon as
//! it starts rather than one interval later.

use super::slot::CancelToken;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest sleep between cancellation checks.
const MAX_NAP: Duration = Duration::from_millis(5);

/// A tick event.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Tick number, starting at 0.
    pub count: u64,
    /// When the tick was due.
    pub due: Instant,
}

/// Ticker actor that generates regular timing events.
pub struct TickerActor {
    handle: Option<JoinHandle<()>>,
    cancel: CancelToken,
    tick_rx: Receiver<Tick>,
}

impl TickerActor {
    /// Spawn a ticker firing every `interval` until `cancel` is set.
    ///
    /// # Panics
    ///
    /// Panics if the OS fails to spawn the ticker thread.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn(interval: Duration, cancel: CancelToken) -> Self {
        let thread_cancel = cancel.clone();

        // Ticks must not pile up behind a slow consumer
        let (tick_tx, tick_rx) = bounded(2);

        let handle = thread::Builder::new()
            .name("superled-ticker".to_string())
            .spawn(move || Self::run_loop(&tick_tx, &thread_cancel, interval))
            .expect("Failed to spawn ticker thread");

        Self {
            handle: Some(handle),
            cancel,
            tick_rx,
        }
    }

    /// Tick receiver, for `recv_timeout` or `select!` loops.
    #[inline]
    pub const fn receiver(&self) -> &Receiver<Tick> {
        &self.tick_rx
    }

    /// Signal the ticker to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Stop the ticker and wait for its thread.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop(tick_tx: &Sender<Tick>, cancel: &CancelToken, interval: Duration) {
        let mut due = Instant::now();
        let mut count = 0u64;

        while !cancel.is_cancelled() {
            let now = Instant::now();
            if now < due {
                thread::sleep((due - now).min(MAX_NAP));
                continue;
            }

            // Dropped when the consumer is behind
            let _ = tick_tx.try_send(Tick { count, due });
            count += 1;
            due += interval;

            // Skip missed ticks instead of bursting
            if due < now {
                due = now + interval;
            }
        }
    }
}

impl Drop for TickerActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
