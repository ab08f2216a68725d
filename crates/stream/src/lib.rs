//! Live chat ingestion over the Pusher websocket protocol.
//!
//! [`ChatStream`] owns one connection per session: it subscribes to the
//! channel's chat rooms, decodes inbound frames into [`ChatRecord`]s, keeps
//! the connection alive, and hands buffered chat to the generation loop via
//! [`ChatStream::drain`].
//!
//! [`ChatRecord`]: chorus_common::ChatRecord

pub mod chat_stream;
pub mod error;
pub mod memory;
pub mod pusher;
pub mod transport;
pub mod websocket;

pub use {
    chat_stream::{ChatStream, Drained},
    error::{Error, Result},
    memory::MemoryTransport,
    transport::{ChatTransport, Connection, Frame, FrameSink, FrameSource},
    websocket::WebSocketTransport,
};
