//! Presence turns the broadcaster's noisy liveness signal into a single
//! debounced "the session is over" decision.

mod monitor;
mod source;

pub use monitor::*;
pub use source::*;
