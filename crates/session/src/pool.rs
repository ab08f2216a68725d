//! Handoff between the generation loop and the sender actors.

use std::sync::{Mutex, MutexGuard};

use {rand::Rng, tokio::sync::watch};

/// Candidate outbound messages for one session.
///
/// The generation loop swaps the whole set with [`replace`](Self::replace);
/// senders remove one random item at a time with [`take`](Self::take),
/// waiting while the pool is empty.
pub struct MessagePool {
    items: Mutex<Vec<String>>,
    // Updated only while `items` is locked, so `true` implies non-empty at
    // the moment it was written.
    has_content: watch::Sender<bool>,
}

impl Default for MessagePool {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagePool {
    #[must_use]
    pub fn new() -> Self {
        let (has_content, _) = watch::channel(false);
        Self {
            items: Mutex::new(Vec::new()),
            has_content,
        }
    }

    fn items(&self) -> MutexGuard<'_, Vec<String>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Discard the current contents and install `items`.
    pub fn replace(&self, items: Vec<String>) {
        let mut guard = self.items();
        *guard = items;
        self.has_content.send_replace(!guard.is_empty());
    }

    /// Remove and return one item chosen uniformly at random, waiting until
    /// the pool has content.
    ///
    /// Cancel-safe: an item is only removed once the future completes.
    pub async fn take(&self) -> String {
        let mut has_content = self.has_content.subscribe();
        loop {
            // The sender lives in `self`, so this cannot observe a close.
            if has_content.wait_for(|has| *has).await.is_err() {
                continue;
            }
            // Another taker may have emptied the pool since the flag flipped.
            if let Some(item) = self.try_take_with(&mut rand::rng()) {
                return item;
            }
        }
    }

    /// Remove one random item if any are present.
    pub fn try_take_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let mut guard = self.items();
        if guard.is_empty() {
            return None;
        }
        let index = rng.random_range(0..guard.len());
        let item = guard.swap_remove(index);
        if guard.is_empty() {
            self.has_content.send_replace(false);
        }
        Some(item)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Current contents, in no particular order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.items().clone()
    }
}
