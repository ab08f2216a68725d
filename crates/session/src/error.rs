use thiserror::Error;

/// Failure looking up a channel's chat room.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("channel {channel} has no chat room")]
    NotFound { channel: String },

    #[error("lookup returned HTTP {status}")]
    Status { status: u16 },

    #[error("lookup request failed: {0}")]
    Transport(String),

    #[error("unexpected lookup response: {0}")]
    Decode(String),
}

/// Failure producing a batch of outbound messages.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation request failed: {0}")]
    Transport(String),

    #[error("generation output was not a message list: {0}")]
    InvalidOutput(String),
}

/// Failure delivering one message. Never fatal to the sender.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("send rejected with HTTP {status}")]
    Rejected { status: u16 },

    #[error("send request failed: {0}")]
    Transport(String),

    #[error("invalid proxy {proxy}: {message}")]
    Proxy { proxy: String, message: String },
}

impl DeliveryError {
    #[must_use]
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }
}

/// Reasons a session could not start.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to resolve chat room for {channel}: {source}")]
    Resolve {
        channel: String,
        #[source]
        source: ResolveError,
    },

    #[error(transparent)]
    Stream(#[from] chorus_stream::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
