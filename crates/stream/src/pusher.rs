//! Pusher envelope codec.
//!
//! Frames are decoded in two stages: the outer `{"event", "data"}` envelope
//! first, then the inner payload only for events we act on. The inner `data`
//! is usually a JSON document encoded as a string, but inline objects are
//! accepted too.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

use chorus_common::{ChatRecord, StreamTarget};

use crate::error::{Error, Result};

pub const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
pub const SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
pub const SUBSCRIBE: &str = "pusher:subscribe";
pub const PING: &str = "pusher:ping";
pub const PONG: &str = "pusher:pong";
pub const CHAT_MESSAGE: &str = "App\\Events\\ChatMessageEvent";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PusherEvent {
    ConnectionEstablished,
    SubscriptionSucceeded { channel: Option<String> },
    ChatMessage(ChatMessage),
    Ping,
    Pong,
    /// Any event we do not act on.
    Other(String),
}

/// Inner payload of a chat message event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: Option<String>,
    pub created_at: String,
}

impl ChatMessage {
    #[must_use]
    pub fn into_record(self) -> ChatRecord {
        ChatRecord {
            id: self.id,
            content: self.content,
            sender: self.sender.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
struct ChatMessagePayload {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    sender: Option<SenderPayload>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Deserialize)]
struct SenderPayload {
    #[serde(default)]
    username: Option<String>,
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<PusherEvent> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let event = match envelope.event.as_str() {
        CONNECTION_ESTABLISHED => PusherEvent::ConnectionEstablished,
        SUBSCRIPTION_SUCCEEDED => PusherEvent::SubscriptionSucceeded {
            channel: envelope.channel,
        },
        PING => PusherEvent::Ping,
        PONG => PusherEvent::Pong,
        CHAT_MESSAGE => {
            let payload: ChatMessagePayload = serde_json::from_value(inner(envelope.data)?)?;
            PusherEvent::ChatMessage(ChatMessage {
                id: id_to_string(payload.id),
                content: payload.content.unwrap_or_default(),
                sender: payload.sender.and_then(|s| s.username),
                created_at: payload.created_at.unwrap_or_default(),
            })
        },
        _ => PusherEvent::Other(envelope.event),
    };
    Ok(event)
}

fn inner(data: Option<Value>) -> Result<Value> {
    match data {
        None | Some(Value::Null) => Ok(Value::Object(Default::default())),
        Some(Value::String(encoded)) if encoded.trim().is_empty() => {
            Ok(Value::Object(Default::default()))
        },
        Some(Value::String(encoded)) => Ok(serde_json::from_str(&encoded)?),
        Some(inline @ Value::Object(_)) => Ok(inline),
        Some(other) => Err(Error::Malformed(format!("unexpected data payload: {other}"))),
    }
}

fn id_to_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn encode(event: &str, data: Option<Value>) -> String {
    let envelope = Envelope {
        event: event.to_string(),
        data,
        channel: None,
    };
    // Serializing a struct of strings and JSON values cannot fail.
    serde_json::to_string(&envelope).unwrap_or_default()
}

/// Subscription request for one Pusher channel.
#[must_use]
pub fn subscribe(channel: &str) -> String {
    encode(
        SUBSCRIBE,
        Some(serde_json::json!({ "auth": "", "channel": channel })),
    )
}

#[must_use]
pub fn ping() -> String {
    encode(PING, None)
}

#[must_use]
pub fn pong() -> String {
    encode(PONG, None)
}

/// Pusher channels carrying a chat room's messages.
#[must_use]
pub fn chatroom_channels(target: StreamTarget) -> [String; 2] {
    [format!("chatrooms.{target}.v2"), format!("chatrooms.{target}")]
}
