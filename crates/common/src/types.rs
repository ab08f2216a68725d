use std::fmt;

use serde::{Deserialize, Serialize};

/// One inbound chat message observed on a channel's stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub content: String,
    pub sender: String,
    pub created_at: String,
}

impl ChatRecord {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        sender: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            sender: sender.into(),
            created_at: created_at.into(),
        }
    }
}

/// Chat room a channel's messages are read from and delivered to.
///
/// Resolved once per session from the channel name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamTarget(pub u64);

impl StreamTarget {
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StreamTarget {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
