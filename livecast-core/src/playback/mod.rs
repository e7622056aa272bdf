//! Playback owns the embedded video player: it issues commands, reports the
//! state the backend pushes, and keeps its timers scoped to one player
//! instance.

mod backend;
mod controller;

pub use backend::*;
pub use controller::*;
