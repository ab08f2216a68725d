//! tokio-tungstenite implementation of [`ChatTransport`].

use {
    async_trait::async_trait,
    futures::{
        SinkExt, StreamExt,
        stream::{SplitSink, SplitStream},
    },
    tokio::net::TcpStream,
    tokio_tungstenite::{
        MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
    },
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    transport::{ChatTransport, Connection, Frame, FrameSink, FrameSource},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to a fixed websocket URL (the Pusher app endpoint).
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ChatTransport for WebSocketTransport {
    async fn connect(&self) -> Result<Connection> {
        let (ws, response) = connect_async(self.url.as_str())
            .await
            .map_err(Error::connection)?;
        debug!(status = %response.status(), "websocket connected");
        let (sink, source) = ws.split();
        Ok(Connection {
            sink: Box::new(WsSink(sink)),
            source: Box::new(WsSource(source)),
        })
    }
}

struct WsSink(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.0.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.0.close().await?;
        Ok(())
    }
}

struct WsSource(SplitStream<WsStream>);

#[async_trait]
impl FrameSource for WsSource {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            match self.0.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text.to_string()))),
                Ok(Message::Binary(data)) => return Some(Ok(Frame::Binary(data.to_vec()))),
                Ok(Message::Close(reason)) => {
                    debug!(?reason, "websocket closed by server");
                    return None;
                },
                // Control frames are answered by tungstenite itself.
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
