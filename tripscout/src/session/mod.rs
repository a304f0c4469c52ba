//! Interactive trip-planning session
//!
//! Search, pick a listing, read its analysis, then explore the area around
//! it. See [`machine::Session`] for the phase loop.

pub mod console;
pub mod machine;
pub mod render;
mod state;

pub use console::{Console, TerminalConsole};
pub use machine::{Session, SessionSettings};
pub use state::{Phase, SessionState, Topic};
