use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    serde::Serialize,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use chorus_session::{BotSession, RecentMessages, SessionDeps, SessionSettings};

use crate::{
    error::{ProbeError, Result, SupervisorError},
    probe::LivenessProbe,
    state::ChannelState,
    task::{TaskHandle, spawn_supervised},
};

/// Timing shared by every managed channel.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub live_check_interval: Duration,
    pub collection_interval: Duration,
    pub keepalive_interval: Duration,
}

/// Snapshot returned by [`ChannelSupervisor::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub status: ChannelState,
    pub recent_messages: Vec<String>,
}

struct ManagedChannel {
    /// Distinguishes this registration from a later one under the same name.
    id: u64,
    state: ChannelState,
    recent: RecentMessages,
    task: TaskHandle,
}

/// The session a monitor is running, shared with the monitor's exit hook.
type SessionSlot = Arc<Mutex<Option<TaskHandle>>>;

struct Inner {
    registry: Mutex<BTreeMap<String, ManagedChannel>>,
    next_id: AtomicU64,
    probe: Arc<dyn LivenessProbe>,
    deps: SessionDeps,
    settings: SupervisorSettings,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, BTreeMap<String, ManagedChannel>> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, channel: &str, id: u64, state: ChannelState) {
        let mut registry = self.registry();
        let Some(entry) = registry.get_mut(channel).filter(|e| e.id == id) else {
            return;
        };
        if entry.state != state {
            info!(channel, from = %entry.state, to = %state, "channel state changed");
            entry.state = state;
        }
    }

    fn remove(&self, channel: &str, id: u64) {
        let mut registry = self.registry();
        if registry.get(channel).is_some_and(|e| e.id == id) {
            registry.remove(channel);
            info!(channel, "channel unregistered");
        }
    }
}

/// Owns one monitoring task per managed channel.
///
/// Each task polls the channel's liveness and runs a [`BotSession`] while
/// the channel is live. A registry entry is only ever removed by the task
/// that owns it, when that task exits.
#[derive(Clone)]
pub struct ChannelSupervisor {
    inner: Arc<Inner>,
}

impl ChannelSupervisor {
    pub fn new(
        probe: Arc<dyn LivenessProbe>,
        deps: SessionDeps,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
                probe,
                deps,
                settings,
            }),
        }
    }

    /// Register `channel` and start monitoring it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, channel: &str, messages_per_minute: u32, sender_count: u32) -> Result<()> {
        if messages_per_minute == 0 {
            return Err(SupervisorError::InvalidParameter {
                field: "messages_per_minute",
            });
        }
        if sender_count == 0 {
            return Err(SupervisorError::InvalidParameter {
                field: "sender_count",
            });
        }

        let mut registry = self.inner.registry();
        if registry.contains_key(channel) {
            return Err(SupervisorError::already_managed(channel));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let recent = RecentMessages::new();
        let session = SessionSlot::default();
        let session_settings = SessionSettings {
            messages_per_minute,
            sender_count,
            collection_interval: self.inner.settings.collection_interval,
            keepalive_interval: self.inner.settings.keepalive_interval,
        };
        let monitor = Monitor {
            inner: Arc::clone(&self.inner),
            channel: channel.to_string(),
            id,
            settings: session_settings,
            recent: recent.clone(),
            session: Arc::clone(&session),
        };

        // The exit hook takes the registry lock, so it cannot run before the
        // entry below is inserted. A monitor that panicked leaves its session
        // in the slot; it is stopped before the entry goes away.
        let task = spawn_supervised(
            channel,
            CancellationToken::new(),
            |cancel| monitor.run(cancel),
            {
                let inner = Arc::clone(&self.inner);
                let channel = channel.to_string();
                move || async move {
                    let orphan = session.lock().unwrap_or_else(|e| e.into_inner()).take();
                    if let Some(orphan) = orphan {
                        warn!(channel, "stopping session left behind by monitor");
                        orphan.shutdown().await;
                    }
                    inner.remove(&channel, id);
                }
            },
        );
        registry.insert(channel.to_string(), ManagedChannel {
            id,
            state: ChannelState::Initializing,
            recent,
            task,
        });
        drop(registry);

        info!(
            channel,
            messages_per_minute, sender_count, "channel registered"
        );
        Ok(())
    }

    /// Cancel a channel's task and wait until it has unregistered itself.
    pub async fn stop(&self, channel: &str) -> Result<()> {
        let task = self
            .inner
            .registry()
            .get(channel)
            .map(|entry| entry.task.clone())
            .ok_or_else(|| SupervisorError::not_found(channel))?;

        info!(channel, "stopping channel");
        task.shutdown().await;
        Ok(())
    }

    pub fn status(&self, channel: &str) -> Result<ChannelStatus> {
        self.inner
            .registry()
            .get(channel)
            .map(|entry| ChannelStatus {
                status: entry.state,
                recent_messages: entry.recent.snapshot(),
            })
            .ok_or_else(|| SupervisorError::not_found(channel))
    }

    /// Every managed channel and its state, sorted by name.
    #[must_use]
    pub fn list(&self) -> BTreeMap<String, ChannelState> {
        self.inner
            .registry()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.state))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.registry().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.registry().is_empty()
    }

    /// Stop every managed channel concurrently.
    pub async fn shutdown(&self) {
        let tasks: Vec<TaskHandle> = self
            .inner
            .registry()
            .values()
            .map(|entry| entry.task.clone())
            .collect();
        if tasks.is_empty() {
            return;
        }
        info!(channels = tasks.len(), "stopping all channels");
        futures::future::join_all(tasks.iter().map(TaskHandle::shutdown)).await;
    }
}

/// The polling loop for one registered channel.
struct Monitor {
    inner: Arc<Inner>,
    channel: String,
    id: u64,
    settings: SessionSettings,
    recent: RecentMessages,
    session: SessionSlot,
}

impl Monitor {
    async fn run(self, cancel: CancellationToken) {
        let channel = self.channel.as_str();
        // Dropping this future cancels any session it started.
        let sessions = cancel.child_token();
        let _stop_sessions = sessions.clone().drop_guard();
        info!(channel, "monitoring channel");

        loop {
            let probed = tokio::select! {
                () = cancel.cancelled() => break,
                probed = self.inner.probe.is_live(channel) => probed,
            };

            match probed {
                Ok(true) => {
                    if self.slot().as_ref().is_some_and(|s| !s.is_finished()) {
                        self.set_state(ChannelState::Running);
                    } else {
                        let previous = self.slot().take();
                        if previous.is_some() {
                            info!(channel, "previous session ended, starting a new one");
                        }
                        self.set_state(ChannelState::Live);
                        let started = self.spawn_session(sessions.child_token());
                        *self.slot() = Some(started);
                        self.set_state(ChannelState::Running);
                    }
                },
                Ok(false) => {
                    let running = self.slot().take();
                    if let Some(running) = running {
                        info!(channel, "channel went offline, stopping session");
                        running.shutdown().await;
                    }
                    self.set_state(ChannelState::Offline);
                },
                Err(e) => {
                    let state = match e {
                        ProbeError::Status { .. } | ProbeError::Transport(_) => {
                            ChannelState::ApiError
                        },
                        ProbeError::Decode(_) => ChannelState::InternalError,
                    };
                    warn!(channel, error = %e, "liveness check failed");
                    self.set_state(state);
                },
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.inner.settings.live_check_interval) => {},
            }
        }

        let running = self.slot().take();
        if let Some(running) = running {
            running.shutdown().await;
        }
        debug!(channel, "monitor exiting");
    }

    fn slot(&self) -> MutexGuard<'_, Option<TaskHandle>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ChannelState) {
        self.inner.set_state(&self.channel, self.id, state);
    }

    fn spawn_session(&self, cancel: CancellationToken) -> TaskHandle {
        let session = BotSession::new(
            self.channel.clone(),
            self.settings.clone(),
            self.inner.deps.clone(),
            self.recent.clone(),
        );
        let channel = self.channel.clone();
        spawn_supervised(
            format!("{}/session", self.channel),
            cancel,
            |cancel| async move {
                if let Err(e) = session.run(cancel).await {
                    error!(channel, error = %e, "bot session failed");
                }
            },
            || async {},
        )
    }
}
