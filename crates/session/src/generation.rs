//! Periodic regeneration of a session's message pool.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {chorus_common::ChatRecord, chorus_stream::ChatStream};

use crate::{error::GenerationError, pool::MessagePool};

/// Produces outbound messages from recent chat.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// May return an empty list.
    async fn generate(&self, history: &[ChatRecord]) -> Result<Vec<String>, GenerationError>;
}

/// What a single generation cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No chat arrived since the last cycle.
    Skipped,
    /// The pool now holds this many messages.
    Replaced(usize),
    /// The service failed; the pool was left as it was.
    Failed,
}

pub struct GenerationScheduler {
    channel: String,
    stream: Arc<ChatStream>,
    pool: Arc<MessagePool>,
    service: Arc<dyn GenerationService>,
    interval: Duration,
}

impl GenerationScheduler {
    pub fn new(
        channel: impl Into<String>,
        stream: Arc<ChatStream>,
        pool: Arc<MessagePool>,
        service: Arc<dyn GenerationService>,
        interval: Duration,
    ) -> Self {
        Self {
            channel: channel.into(),
            stream,
            pool,
            service,
            interval,
        }
    }

    /// Sleep, drain, generate, replace; until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {},
            }
            // A cycle in flight is abandoned on cancel; the pool is only
            // touched after the service returns.
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = self.cycle() => {},
            }
        }
        debug!(channel = %self.channel, "generation scheduler stopped");
    }

    pub async fn cycle(&self) -> CycleOutcome {
        let drained = self.stream.drain();
        if drained.ignored > 0 {
            info!(
                channel = %self.channel,
                ignored = drained.ignored,
                "ignored messages from own accounts"
            );
        }
        if drained.records.is_empty() {
            debug!(channel = %self.channel, "no new chat, skipping generation");
            return CycleOutcome::Skipped;
        }

        match self.service.generate(&drained.records).await {
            Ok(messages) => {
                let count = messages.len();
                self.pool.replace(messages);
                info!(
                    channel = %self.channel,
                    history = drained.records.len(),
                    generated = count,
                    "message pool refreshed"
                );
                CycleOutcome::Replaced(count)
            },
            Err(e) => {
                warn!(channel = %self.channel, error = %e, "message generation failed");
                CycleOutcome::Failed
            },
        }
    }
}
