//! Frame slot: the shared frame buffer plus its single-slot "ready" signal.
//!
//! Producers hold a [`FrameHandle`] and write under the lock; the transmit
//! actor owns the [`FrameSlot`] and calls [`FrameSlot::take`], which copies
//! the frame and clears the ready flag in one critical section. A frame
//! marked ready while a transmission is in flight replaces the pending one
//! rather than queueing behind it.

use crate::buffer::FrameBuffer;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep inside [`CancelToken::sleep`].
const SLEEP_SLICE: Duration = Duration::from_millis(10);

struct SlotState {
    frame: FrameBuffer,
    ready: bool,
}

struct Shared {
    state: Mutex<SlotState>,
    wake_tx: Sender<()>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // A panicking producer leaves a frame that is still a valid frame
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn signal(&self) {
        // Full means a wake-up is already pending
        let _ = self.wake_tx.try_send(());
    }
}

/// Owner side of the shared frame buffer.
pub struct FrameSlot {
    shared: Arc<Shared>,
    wake_rx: Receiver<()>,
}

impl FrameSlot {
    /// Create a slot holding an unset frame.
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SlotState {
                    frame: FrameBuffer::new(),
                    ready: false,
                }),
                wake_tx,
            }),
            wake_rx,
        }
    }

    /// A producer handle onto this slot.
    pub fn handle(&self) -> FrameHandle {
        FrameHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Wake-up channel, readable once per batch of `publish`/`update` calls.
    ///
    /// A wake-up does not guarantee a frame: check with [`take`](Self::take).
    #[inline]
    pub const fn signal(&self) -> &Receiver<()> {
        &self.wake_rx
    }

    /// Snapshot the frame and clear the ready flag, atomically.
    ///
    /// Returns `None` when nothing is ready or the frame was never written.
    pub fn take(&self) -> Option<FrameBuffer> {
        let mut state = self.shared.lock();
        if !state.ready {
            return None;
        }
        state.ready = false;
        state.frame.is_initialized().then(|| state.frame.clone())
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer side of the shared frame buffer. Cheap to clone.
#[derive(Clone)]
pub struct FrameHandle {
    shared: Arc<Shared>,
}

impl FrameHandle {
    /// Mutate the frame under the lock, then mark it ready.
    pub fn update<R>(&self, f: impl FnOnce(&mut FrameBuffer) -> R) -> R {
        let result = {
            let mut state = self.shared.lock();
            let result = f(&mut state.frame);
            state.ready = true;
            result
        };
        self.shared.signal();
        result
    }

    /// Replace the frame wholesale and mark it ready.
    pub fn publish(&self, frame: FrameBuffer) {
        self.update(|current| *current = frame);
    }

    /// Clear the ready flag without touching the frame.
    pub fn withdraw(&self) {
        self.shared.lock().ready = false;
    }

    /// Whether a frame is waiting to be transmitted.
    pub fn is_ready(&self) -> bool {
        self.shared.lock().ready
    }

    /// Copy of the current frame, ready or not.
    pub fn snapshot(&self) -> FrameBuffer {
        self.shared.lock().frame.clone()
    }
}

impl std::fmt::Debug for FrameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHandle")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

/// Cooperative cancellation flag shared by producers and the transmit actor.
///
/// A child token is cancelled when either it or any ancestor is.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Box<CancelToken>>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that can be cancelled on its own, and follows `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Cancel this token and all its children.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether this token or an ancestor was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// Returns `false` if the token was cancelled before the time was up.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Rgb;

    #[test]
    fn test_unset_frame_is_never_taken() {
        let slot = FrameSlot::new();
        let handle = slot.handle();
        handle.update(|_| ());
        assert!(slot.take().is_none());
        assert!(!handle.is_ready());
    }

    #[test]
    fn test_take_clears_ready() {
        let slot = FrameSlot::new();
        let handle = slot.handle();
        handle.publish(FrameBuffer::filled(Rgb::RED));

        assert!(handle.is_ready());
        assert_eq!(slot.take(), Some(FrameBuffer::filled(Rgb::RED)));
        assert!(!handle.is_ready());
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_updates_coalesce() {
        let slot = FrameSlot::new();
        let handle = slot.handle();
        for shade in 1..=5 {
            handle.publish(FrameBuffer::filled(Rgb::splat(shade)));
        }

        assert!(slot.signal().try_recv().is_ok());
        assert!(slot.signal().try_recv().is_err());
        assert_eq!(slot.take(), Some(FrameBuffer::filled(Rgb::splat(5))));
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_withdraw() {
        let slot = FrameSlot::new();
        let handle = slot.handle();
        handle.publish(FrameBuffer::filled(Rgb::WHITE));
        handle.withdraw();
        assert!(slot.take().is_none());
        assert_eq!(handle.snapshot(), FrameBuffer::filled(Rgb::WHITE));
    }

    #[test]
    fn test_child_token_follows_parent() {
        let root = CancelToken::new();
        let child = root.child();
        let sibling = root.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());
        assert!(!sibling.is_cancelled());

        root.cancel();
        assert!(sibling.is_cancelled());
    }

    #[test]
    fn test_sleep_wakes_on_cancel() {
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        assert!(!token.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
        canceller.join().unwrap();
    }

    #[test]
    fn test_sleep_completes() {
        assert!(CancelToken::new().sleep(Duration::from_millis(5)));
    }
}
