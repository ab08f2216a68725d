use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a managed channel as reported by status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// Registered; no probe has completed yet.
    Initializing,
    Offline,
    /// Live, session not yet started.
    Live,
    /// Live with a session running.
    Running,
    /// The last probe failed at the API.
    ApiError,
    /// The last probe failed for any other reason.
    InternalError,
}

impl ChannelState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Offline => "offline",
            Self::Live => "live",
            Self::Running => "running",
            Self::ApiError => "api_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
