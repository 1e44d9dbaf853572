//! Actor Model: the producer/transmitter split.
//!
//! - **Frame Slot**: the shared frame buffer and its single-slot ready signal
//! - **Transmit Actor**: owns the device link, sends ready frames, applies effects
//! - **Ticker Actor**: fixed-interval pacing for the clock face
//! - **Producers**: text scroller, image player, clock; run on the caller's thread
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  update/publish   ┌───────────┐   take()   ┌────────────────┐
//! │   Producer   │ ────────────────▶ │ FrameSlot │ ─────────▶ │ Transmit Thread│ ──▶ Link
//! └──────────────┘                   └───────────┘            └────────────────┘
//!        ▲                                                        ▲      │
//!        │ CancelToken                       TransmitCommand      │      │ fatal error:
//!        └──────────────────────────────────────────────────────────────┘ cancel
//! ```

mod messages;
mod slot;
mod ticker;
mod transmit;

pub use messages::{Effect, TransmitCommand};
pub use slot::{CancelToken, FrameHandle, FrameSlot};
pub use ticker::{Tick, TickerActor};
pub use transmit::{TransmitActor, TransmitStats};
