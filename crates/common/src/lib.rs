//! Shared value types passed between the stream, session, and supervisor crates.

pub mod types;

pub use types::{ChatRecord, StreamTarget};
