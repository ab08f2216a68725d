//! In-process [`ChatTransport`] backed by channels.
//!
//! Frames pushed with [`MemoryTransport::push_text`] arrive on the most recent
//! connection; everything a stream sends is recorded and can be read back
//! with [`MemoryTransport::sent`].

use std::sync::{Arc, Mutex, MutexGuard};

use {async_trait::async_trait, tokio::sync::mpsc};

use crate::{
    error::{Error, Result},
    transport::{ChatTransport, Connection, Frame, FrameSink, FrameSource},
};

#[derive(Default)]
struct MemoryState {
    inbound: Option<mpsc::UnboundedSender<Frame>>,
    sent: Vec<String>,
    connects: usize,
    refuse: bool,
}

#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make subsequent `connect` calls fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.state().refuse = refuse;
    }

    /// Deliver a frame to the current connection. Returns `false` when there
    /// is no open connection.
    pub fn push(&self, frame: Frame) -> bool {
        self.state()
            .inbound
            .as_ref()
            .is_some_and(|tx| tx.send(frame).is_ok())
    }

    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.push(Frame::Text(text.into()))
    }

    /// Close the current connection from the remote side.
    pub fn close(&self) {
        self.state().inbound = None;
    }

    /// Whether a connection is open and its reader is still alive.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state()
            .inbound
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Every frame sent so far, across all connections.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state().connects
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn connect(&self) -> Result<Connection> {
        let mut state = self.state();
        if state.refuse {
            return Err(Error::connection("connection refused"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.inbound = Some(tx);
        state.connects += 1;
        Ok(Connection {
            sink: Box::new(MemorySink {
                state: Arc::clone(&self.state),
            }),
            source: Box::new(MemorySource { rx }),
        })
    }
}

struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sent
            .push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct MemorySource {
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        self.rx.recv().await.map(Ok)
    }
}
