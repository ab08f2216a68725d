use thiserror::Error;

/// Misuse of the supervisor's lifecycle operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("channel {channel} is already managed")]
    AlreadyManaged { channel: String },

    #[error("channel {channel} is not managed")]
    NotFound { channel: String },

    #[error("{field} must be positive")]
    InvalidParameter { field: &'static str },
}

impl SupervisorError {
    pub(crate) fn already_managed(channel: &str) -> Self {
        Self::AlreadyManaged {
            channel: channel.to_string(),
        }
    }

    pub(crate) fn not_found(channel: &str) -> Self {
        Self::NotFound {
            channel: channel.to_string(),
        }
    }
}

/// Failed liveness check.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The API answered with an error status.
    #[error("channel lookup returned HTTP {status}")]
    Status { status: u16 },

    #[error("channel lookup failed: {0}")]
    Transport(String),

    /// The API answered but the body made no sense.
    #[error("unexpected channel response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
