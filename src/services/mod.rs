//! External collaborator module
//!
//! Interfaces the round engine consumes (view surface, mini-game hooks) and
//! exposes (statistics reporting), with the implementations the binary and
//! tests use.

pub mod hooks;
pub mod reporter;
pub mod surface;

// Re-export main types
pub use hooks::{NoopHooks, RoundHooks};
pub use reporter::{JsonLinesReporter, LogReporter, StatsReporter};
pub use surface::{HeadlessSurface, RoundSurface, SurfaceState, ViewId};
