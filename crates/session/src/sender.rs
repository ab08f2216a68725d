//! Rate-paced sender actors.
//!
//! Each actor sends roughly one message per [`Pacing::midpoint`]; with
//! `sender_count` actors running the channel as a whole approaches the
//! requested messages per minute. Every pause is jittered to ±50% of the
//! midpoint so actors drift apart instead of sending in bursts.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    rand::Rng,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {
    chorus_common::StreamTarget,
    chorus_config::{Account, Credentials},
};

use crate::{error::DeliveryError, pool::MessagePool, recent::RecentMessages};

/// Posts a message into a chat room as one account.
#[async_trait]
pub trait DeliveryService: Send + Sync {
    async fn send(
        &self,
        account: &Account,
        proxy: Option<&str>,
        target: StreamTarget,
        content: &str,
    ) -> Result<(), DeliveryError>;
}

/// Per-actor pause between sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    midpoint: Duration,
}

impl Pacing {
    /// `sender_count * 60 / messages_per_minute` seconds.
    #[must_use]
    pub fn new(sender_count: u32, messages_per_minute: u32) -> Self {
        let secs = f64::from(sender_count) * 60.0 / f64::from(messages_per_minute.max(1));
        Self {
            midpoint: Duration::from_secs_f64(secs),
        }
    }

    #[must_use]
    pub fn midpoint(&self) -> Duration {
        self.midpoint
    }

    /// Uniform in `[0.5, 1.5] * midpoint`.
    pub fn jittered<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.midpoint.mul_f64(rng.random_range(0.5..=1.5))
    }
}

/// Shared state for a session's sender actors.
pub struct SenderPool {
    channel: String,
    target: StreamTarget,
    pool: Arc<MessagePool>,
    credentials: Arc<Credentials>,
    delivery: Arc<dyn DeliveryService>,
    recent: RecentMessages,
    pacing: Pacing,
}

impl SenderPool {
    pub fn new(
        channel: impl Into<String>,
        target: StreamTarget,
        pool: Arc<MessagePool>,
        credentials: Arc<Credentials>,
        delivery: Arc<dyn DeliveryService>,
        recent: RecentMessages,
        pacing: Pacing,
    ) -> Self {
        Self {
            channel: channel.into(),
            target,
            pool,
            credentials,
            delivery,
            recent,
            pacing,
        }
    }

    #[must_use]
    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// One actor: take, send, pause; until cancelled.
    ///
    /// Returns immediately when no accounts are configured.
    pub async fn run_actor(&self, index: usize, cancel: CancellationToken) {
        if !self.credentials.has_accounts() {
            warn!(channel = %self.channel, sender = index, "no accounts configured, sender idle");
            return;
        }
        debug!(
            channel = %self.channel,
            sender = index,
            midpoint_secs = self.pacing.midpoint().as_secs_f64(),
            "sender started"
        );

        loop {
            let message = tokio::select! {
                () = cancel.cancelled() => break,
                message = self.pool.take() => message,
            };

            tokio::select! {
                () = cancel.cancelled() => break,
                () = self.deliver(index, &message) => {},
            }

            let pause = self.pacing.jittered(&mut rand::rng());
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(pause) => {},
            }
        }
        debug!(channel = %self.channel, sender = index, "sender stopped");
    }

    async fn deliver(&self, index: usize, message: &str) {
        let picked = self.credentials.pick(&mut rand::rng());
        let Some((account, proxy)) = picked else {
            return;
        };

        match self
            .delivery
            .send(account, proxy, self.target, message)
            .await
        {
            Ok(()) => {
                info!(
                    channel = %self.channel,
                    sender = index,
                    account = account.display_name(),
                    "message sent"
                );
                self.recent.record(account.display_name(), message);
            },
            Err(e) => {
                warn!(
                    channel = %self.channel,
                    sender = index,
                    account = account.display_name(),
                    error = %e,
                    "message delivery failed"
                );
            },
        }
    }
}
