//! Config schema types. Every section defaults, so an empty file is valid
//! apart from the generation API key.

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Pusher endpoint Kick's web client subscribes to.
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://ws-us2.pusher.com/app/32cbd69e4b950bf97679?protocol=7&client=js&version=8.4.0&flash=false";

/// Pusher drops a connection after this long without traffic.
pub const SERVER_IDLE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChorusConfig {
    pub server: ServerConfig,
    pub supervisor: SupervisorConfig,
    pub session: SessionConfig,
    pub kick: KickConfig,
    pub generation: GenerationConfig,
    pub credentials: CredentialsConfig,
}

/// HTTP control surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Seconds between liveness probes for each managed channel.
    pub live_check_interval_secs: u64,
}

impl SupervisorConfig {
    #[must_use]
    pub fn live_check_interval(&self) -> Duration {
        Duration::from_secs(self.live_check_interval_secs)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            live_check_interval_secs: 30,
        }
    }
}

/// Per-session timing and the defaults applied to start requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of chat collected before each generation cycle.
    pub message_collection_secs: u64,
    /// Seconds between keepalive probes on the chat stream.
    pub keepalive_interval_secs: u64,
    pub default_messages_per_minute: u32,
    pub default_sender_count: u32,
}

impl SessionConfig {
    #[must_use]
    pub fn message_collection_interval(&self) -> Duration {
        Duration::from_secs(self.message_collection_secs)
    }

    #[must_use]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            message_collection_secs: 30,
            keepalive_interval_secs: 50,
            default_messages_per_minute: 20,
            default_sender_count: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KickConfig {
    pub api_base: String,
    pub websocket_url: String,
    pub request_timeout_secs: u64,
    pub send_timeout_secs: u64,
}

impl Default for KickConfig {
    fn default() -> Self {
        Self {
            api_base: "https://kick.com".into(),
            websocket_url: DEFAULT_WEBSOCKET_URL.into(),
            request_timeout_secs: 30,
            send_timeout_secs: 15,
        }
    }
}

/// OpenRouter chat-completions settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    #[serde(serialize_with = "serialize_secret")]
    pub api_key: Secret<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Number of messages requested per generation cycle.
    pub batch_size: usize,
}

impl GenerationConfig {
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::new(String::new()),
            endpoint: "https://openrouter.ai/api/v1/chat/completions".into(),
            model: "google/gemini-2.5-flash".into(),
            timeout_secs: 60,
            batch_size: 100,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Locations of the account and proxy lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub accounts_file: String,
    pub proxies_file: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            accounts_file: "accs.txt".into(),
            proxies_file: "proxies.txt".into(),
        }
    }
}
