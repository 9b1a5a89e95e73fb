//! Utility functions module
//!
//! Clock sources shared by the timing components, and signal handling for
//! the binary.

pub mod clock;
pub mod signals;

// Re-export main items
pub use clock::{Clock, ManualClock, SharedClock, SystemClock, TokioClock};
pub use signals::shutdown_signal;
