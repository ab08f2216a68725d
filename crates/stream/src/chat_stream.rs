use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    tokio::time::{Instant, MissedTickBehavior},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, trace, warn},
};

use chorus_common::{ChatRecord, StreamTarget};

use crate::{
    error::{Error, Result},
    pusher::{self, PusherEvent},
    transport::{ChatTransport, Connection, Frame},
};

/// Chat accepted since the previous drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drained {
    /// Accepted records, in arrival order.
    pub records: Vec<ChatRecord>,
    /// Records dropped because their sender is one of our own accounts.
    pub ignored: usize,
}

#[derive(Default)]
struct ChatBuffer {
    records: Vec<ChatRecord>,
    ignored: usize,
}

/// One streaming chat connection for a single chat room.
pub struct ChatStream {
    target: StreamTarget,
    transport: Arc<dyn ChatTransport>,
    ignored_senders: HashSet<String>,
    keepalive_interval: Duration,
    connection: tokio::sync::Mutex<Option<Connection>>,
    // Records and the ignored counter share one lock so a drain is atomic.
    buffer: Mutex<ChatBuffer>,
}

impl ChatStream {
    pub fn new(
        target: StreamTarget,
        transport: Arc<dyn ChatTransport>,
        ignored_senders: HashSet<String>,
        keepalive_interval: Duration,
    ) -> Self {
        Self {
            target,
            transport,
            ignored_senders,
            keepalive_interval,
            connection: tokio::sync::Mutex::new(None),
            buffer: Mutex::new(ChatBuffer::default()),
        }
    }

    #[must_use]
    pub fn target(&self) -> StreamTarget {
        self.target
    }

    /// Open the connection and subscribe to the chat room's channels.
    pub async fn connect(&self) -> Result<()> {
        let mut conn = self.transport.connect().await.map_err(|e| match e {
            Error::Connection(_) => e,
            other => Error::connection(other),
        })?;

        for channel in pusher::chatroom_channels(self.target) {
            conn.sink
                .send(pusher::subscribe(&channel))
                .await
                .map_err(|e| Error::connection(format!("subscribe to {channel}: {e}")))?;
            info!(target = %self.target, channel, "subscribed to chat channel");
        }

        *self.connection.lock().await = Some(conn);
        Ok(())
    }

    /// Read frames until the remote closes the connection or `cancel` fires.
    ///
    /// Connects first if [`connect`](Self::connect) has not been called. A
    /// keepalive ping goes out every `keepalive_interval` for as long as this
    /// runs. Frames that fail to decode are skipped.
    pub async fn listen(&self, cancel: CancellationToken) -> Result<()> {
        let pending = self.connection.lock().await.take();
        let Connection {
            mut sink,
            mut source,
        } = match pending {
            Some(conn) => conn,
            None => {
                self.connect().await?;
                self.connection.lock().await.take().ok_or(Error::Closed)?
            },
        };

        let period = self.keepalive_interval;
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(target = %self.target, "listening for chat messages");
        let outcome = loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(target = %self.target, "chat listener cancelled");
                    break Ok(());
                },
                _ = keepalive.tick() => {
                    if let Err(e) = sink.send(pusher::ping()).await {
                        break Err(e);
                    }
                    trace!(target = %self.target, "sent keepalive ping");
                },
                frame = source.next_frame() => match frame {
                    None => {
                        info!(target = %self.target, "chat connection closed by server");
                        break Ok(());
                    },
                    Some(Err(e)) => break Err(e),
                    Some(Ok(frame)) => {
                        if let Some(reply) = self.handle_frame(frame)
                            && let Err(e) = sink.send(reply).await
                        {
                            break Err(e);
                        }
                    },
                },
            }
        };

        if let Err(e) = sink.close().await {
            debug!(target = %self.target, error = %e, "error closing chat connection");
        }
        outcome
    }

    /// Classify one frame and update state. Returns a frame to send back,
    /// if the protocol calls for one.
    fn handle_frame(&self, frame: Frame) -> Option<String> {
        let event = match frame.into_text().and_then(|text| pusher::decode(&text)) {
            Ok(event) => event,
            Err(e) => {
                debug!(target = %self.target, error = %e, "ignoring undecodable frame");
                return None;
            },
        };

        match event {
            PusherEvent::ConnectionEstablished => {
                info!(target = %self.target, "pusher connection confirmed");
                None
            },
            PusherEvent::SubscriptionSucceeded { channel } => {
                debug!(target = %self.target, ?channel, "subscription confirmed");
                None
            },
            PusherEvent::ChatMessage(msg) => {
                self.accept(msg.into_record());
                None
            },
            PusherEvent::Ping => Some(pusher::pong()),
            PusherEvent::Pong => None,
            PusherEvent::Other(event) => {
                trace!(target = %self.target, event, "ignoring event");
                None
            },
        }
    }

    fn accept(&self, record: ChatRecord) {
        let mut buffer = self.buffer();
        if self.ignored_senders.contains(&record.sender) {
            buffer.ignored += 1;
            return;
        }
        buffer.records.push(record);
    }

    fn buffer(&self) -> MutexGuard<'_, ChatBuffer> {
        self.buffer.lock().unwrap_or_else(|e| {
            warn!(target = %self.target, "chat buffer lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Take everything buffered since the last drain and reset the buffer.
    pub fn drain(&self) -> Drained {
        let mut buffer = self.buffer();
        Drained {
            records: std::mem::take(&mut buffer.records),
            ignored: std::mem::take(&mut buffer.ignored),
        }
    }
}
