use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Entries kept per channel.
pub const RECENT_CAPACITY: usize = 20;

/// Bounded log of the last messages a channel's senders delivered.
///
/// Cloning shares the same log.
#[derive(Debug, Clone, Default)]
pub struct RecentMessages {
    entries: Arc<Mutex<VecDeque<String>>>,
}

impl RecentMessages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivered message as `[sender]: content`.
    pub fn record(&self, sender: &str, content: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == RECENT_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(format!("[{sender}]: {content}"));
    }

    /// Oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}
