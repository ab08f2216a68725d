use std::{fmt, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tokio::task::JoinSet,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use {
    chorus_common::StreamTarget,
    chorus_config::Credentials,
    chorus_stream::{ChatStream, ChatTransport},
};

use crate::{
    error::{ResolveError, Result, SessionError},
    generation::{GenerationScheduler, GenerationService},
    pool::MessagePool,
    recent::RecentMessages,
    sender::{DeliveryService, Pacing, SenderPool},
};

/// Maps a channel name to the chat room its messages flow through.
#[async_trait]
pub trait StreamTargetResolver: Send + Sync {
    async fn resolve(&self, channel: &str) -> std::result::Result<StreamTarget, ResolveError>;
}

/// External collaborators shared by every session.
#[derive(Clone)]
pub struct SessionDeps {
    pub resolver: Arc<dyn StreamTargetResolver>,
    pub transport: Arc<dyn ChatTransport>,
    pub generator: Arc<dyn GenerationService>,
    pub delivery: Arc<dyn DeliveryService>,
    pub credentials: Arc<Credentials>,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub messages_per_minute: u32,
    pub sender_count: u32,
    pub collection_interval: Duration,
    pub keepalive_interval: Duration,
}

#[derive(Debug, Clone, Copy)]
enum Child {
    Listener,
    Generator,
    Sender(usize),
}

impl fmt::Display for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listener => write!(f, "listener"),
            Self::Generator => write!(f, "generator"),
            Self::Sender(i) => write!(f, "sender-{i}"),
        }
    }
}

/// Everything that runs for one channel while it is live.
pub struct BotSession {
    channel: String,
    settings: SessionSettings,
    deps: SessionDeps,
    recent: RecentMessages,
}

impl BotSession {
    pub fn new(
        channel: impl Into<String>,
        settings: SessionSettings,
        deps: SessionDeps,
        recent: RecentMessages,
    ) -> Self {
        Self {
            channel: channel.into(),
            settings,
            deps,
            recent,
        }
    }

    /// Run the session until `cancel` fires or one of its activities ends.
    ///
    /// Every child task has stopped by the time this returns. Fails only if
    /// the chat room cannot be resolved or connected.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let channel = self.channel.as_str();

        let resolved = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            resolved = self.deps.resolver.resolve(channel) => resolved,
        };
        let target = resolved.map_err(|source| SessionError::Resolve {
            channel: channel.to_string(),
            source,
        })?;

        let stream = Arc::new(ChatStream::new(
            target,
            Arc::clone(&self.deps.transport),
            self.deps.credentials.bot_usernames(),
            self.settings.keepalive_interval,
        ));
        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            connected = stream.connect() => connected?,
        }

        let pool = Arc::new(MessagePool::new());
        let group = cancel.child_token();
        let mut children = JoinSet::new();

        children.spawn({
            let stream = Arc::clone(&stream);
            let token = group.clone();
            let channel = self.channel.clone();
            async move {
                if let Err(e) = stream.listen(token).await {
                    warn!(channel, error = %e, "chat listener failed");
                }
                Child::Listener
            }
        });

        let scheduler = GenerationScheduler::new(
            channel,
            Arc::clone(&stream),
            Arc::clone(&pool),
            Arc::clone(&self.deps.generator),
            self.settings.collection_interval,
        );
        children.spawn({
            let token = group.clone();
            async move {
                scheduler.run(token).await;
                Child::Generator
            }
        });

        if self.deps.credentials.has_accounts() {
            let senders = Arc::new(SenderPool::new(
                channel,
                target,
                Arc::clone(&pool),
                Arc::clone(&self.deps.credentials),
                Arc::clone(&self.deps.delivery),
                self.recent.clone(),
                Pacing::new(self.settings.sender_count, self.settings.messages_per_minute),
            ));
            for index in 0..self.settings.sender_count as usize {
                let senders = Arc::clone(&senders);
                let token = group.clone();
                children.spawn(async move {
                    senders.run_actor(index, token).await;
                    Child::Sender(index)
                });
            }
        } else {
            warn!(channel, "no accounts loaded, session will not send");
        }

        info!(
            channel,
            %target,
            senders = children.len().saturating_sub(2),
            messages_per_minute = self.settings.messages_per_minute,
            "bot session started"
        );

        let first = tokio::select! {
            () = cancel.cancelled() => None,
            joined = children.join_next() => joined,
        };
        match first {
            None if cancel.is_cancelled() => info!(channel, "bot session cancelled"),
            None => {},
            Some(Ok(child)) => warn!(channel, %child, "session activity ended, stopping session"),
            Some(Err(e)) => error!(channel, error = %e, "session activity crashed, stopping session"),
        }

        group.cancel();
        while let Some(joined) = children.join_next().await {
            if let Err(e) = joined {
                error!(channel, error = %e, "session activity crashed during shutdown");
            }
        }
        info!(channel, "bot session stopped");
        Ok(())
    }
}
