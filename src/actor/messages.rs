//! Message types for the transmit actor.

use crate::error::Result;
use crossbeam_channel::Sender;

/// A one-off device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Set the global LED brightness (device scale 0-255).
    Brightness(u8),
    /// Run the device's built-in hardware test pattern.
    SelfTest,
    /// Turn every LED off.
    Blank,
}

impl Effect {
    /// Command byte on the wire.
    pub const fn code(self) -> u8 {
        match self {
            Self::Brightness(_) => b'B',
            Self::SelfTest => b'T',
            Self::Blank => b'Z',
        }
    }

    /// Value byte following the command, if any.
    pub const fn value(self) -> Option<u8> {
        match self {
            Self::Brightness(level) => Some(level),
            Self::SelfTest | Self::Blank => None,
        }
    }
}

/// Commands sent to the transmit thread.
#[derive(Debug)]
pub enum TransmitCommand {
    /// Apply an effect between frames and report the outcome.
    Effect {
        /// The effect to apply.
        effect: Effect,
        /// Where the result goes.
        reply: Sender<Result<()>>,
    },

    /// Blank, disconnect and stop.
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_codes() {
        assert_eq!(Effect::Brightness(40).code(), b'B');
        assert_eq!(Effect::Brightness(40).value(), Some(40));
        assert_eq!(Effect::SelfTest.code(), b'T');
        assert_eq!(Effect::SelfTest.value(), None);
        assert_eq!(Effect::Blank.code(), b'Z');
    }
}
