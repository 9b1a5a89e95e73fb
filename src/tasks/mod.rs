//! Background tasks module
//!
//! The round session task: the single timeline every component of a round
//! is ticked and commanded on.

pub mod round_session;

// Re-export main types
pub use round_session::{RoundSession, RoundSessionBuilder};
