//! Terminal output: the offline preview sink.

mod preview;

pub use preview::TerminalPreview;
