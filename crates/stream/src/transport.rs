//! Connection primitives [`ChatStream`](crate::ChatStream) is written against.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// One inbound payload, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Text payload; binary payloads must be UTF-8.
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Binary(bytes) => {
                String::from_utf8(bytes).map_err(|e| Error::Malformed(e.to_string()))
            },
        }
    }
}

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, text: String) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// Read half of a connection. `None` means the remote closed it.
///
/// `next_frame` must be cancel-safe: dropping a pending call loses no frame.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Option<Result<Frame>>;
}

/// An open connection, split so that reads and writes can interleave.
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

/// Opens persistent streaming connections to the chat server.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<Connection>;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_frames_decode_as_utf8() {
        let frame = Frame::Binary(br#"{"event":"pusher:ping"}"#.to_vec());
        assert_eq!(frame.into_text().unwrap(), r#"{"event":"pusher:ping"}"#);
        assert!(matches!(
            Frame::Binary(vec![0xff, 0xfe]).into_text(),
            Err(Error::Malformed(_))
        ));
    }
}
