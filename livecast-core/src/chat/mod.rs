//! Chat reconciles the upstream snapshot log with locally-sent optimistic
//! messages into one deduplicated display list.

mod message;
mod reconciler;
mod source;

pub use message::*;
pub use reconciler::*;
pub use source::*;
