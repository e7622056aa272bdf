//! In-process implementations of the livecast collaborator traits.
//!
//! These back the integration tests, and let embedders run a working client
//! without a real vendor backend.

mod chat;
mod presence;
mod telemetry;
mod video;

pub use chat::*;
pub use presence::*;
pub use telemetry::*;
pub use video::*;
