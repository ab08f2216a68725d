//! Channel lookups: liveness and chat room resolution.

use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::{Client, Response, header},
    serde_json::Value,
    tracing::debug,
};

use {
    chorus_common::StreamTarget,
    chorus_config::KickConfig,
    chorus_session::{ResolveError, StreamTargetResolver},
    chorus_supervisor::{LivenessProbe, ProbeError},
};

/// Browser user agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Read-only client for the public channel API.
#[derive(Debug, Clone)]
pub struct KickClient {
    http: Client,
    api_base: String,
}

impl KickClient {
    pub fn new(config: &KickConfig) -> reqwest::Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(http, &config.api_base))
    }

    #[must_use]
    pub fn with_client(http: Client, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn channel_url(&self, channel: &str) -> String {
        format!("{}/api/v2/channels/{channel}", self.api_base)
    }

    async fn get(&self, url: &str, channel: &str) -> reqwest::Result<Response> {
        debug!(url, "kick api request");
        self.http
            .get(url)
            .header(header::ACCEPT, "application/json")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(header::REFERER, format!("{}/{channel}", self.api_base))
            .send()
            .await
    }
}

#[async_trait]
impl LivenessProbe for KickClient {
    async fn is_live(&self, channel: &str) -> Result<bool, ProbeError> {
        let resp = self
            .get(&self.channel_url(channel), channel)
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ProbeError::Decode(e.to_string()))?;
        if !body.is_object() {
            return Err(ProbeError::Decode(format!("expected an object, got {body}")));
        }
        Ok(body.get("livestream").is_some_and(|l| !l.is_null()))
    }
}

#[async_trait]
impl StreamTargetResolver for KickClient {
    async fn resolve(&self, channel: &str) -> Result<StreamTarget, ResolveError> {
        let url = format!("{}/chatroom", self.channel_url(channel));
        let resp = self
            .get(&url, channel)
            .await
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ResolveError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ResolveError::Decode(e.to_string()))?;
        match body.get("id").and_then(Value::as_u64) {
            Some(id) if id > 0 => Ok(StreamTarget(id)),
            _ => Err(ResolveError::NotFound {
                channel: channel.to_string(),
            }),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &mockito::Server) -> KickClient {
        KickClient::with_client(Client::new(), &format!("{}/", server.url()))
    }

    #[tokio::test]
    async fn live_when_livestream_is_present() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/channels/alice")
            .match_header("referer", format!("{}/alice", server.url()).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"slug":"alice","livestream":{"id":9,"is_live":true}}"#)
            .create_async()
            .await;

        assert!(client(&server).is_live("alice").await.unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn offline_when_livestream_is_null_or_missing() {
        let mut server = mockito::Server::new_async().await;
        let _null = server
            .mock("GET", "/api/v2/channels/bob")
            .with_status(200)
            .with_body(r#"{"slug":"bob","livestream":null}"#)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/api/v2/channels/carol")
            .with_status(200)
            .with_body(r#"{"slug":"carol"}"#)
            .create_async()
            .await;

        let client = client(&server);
        assert!(!client.is_live("bob").await.unwrap());
        assert!(!client.is_live("carol").await.unwrap());
    }

    #[tokio::test]
    async fn probe_errors_are_classified() {
        let mut server = mockito::Server::new_async().await;
        let _blocked = server
            .mock("GET", "/api/v2/channels/blocked")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;
        let _garbled = server
            .mock("GET", "/api/v2/channels/garbled")
            .with_status(200)
            .with_body("<html>challenge</html>")
            .create_async()
            .await;

        let client = client(&server);
        assert!(matches!(
            client.is_live("blocked").await,
            Err(ProbeError::Status { status: 403 })
        ));
        assert!(matches!(
            client.is_live("garbled").await,
            Err(ProbeError::Decode(_))
        ));

        let unreachable = KickClient::with_client(Client::new(), "http://127.0.0.1:1");
        assert!(matches!(
            unreachable.is_live("alice").await,
            Err(ProbeError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn resolves_chat_room_id() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/api/v2/channels/alice/chatroom")
            .with_status(200)
            .with_body(r#"{"id":668,"slow_mode":false}"#)
            .create_async()
            .await;
        let _no_id = server
            .mock("GET", "/api/v2/channels/ghost/chatroom")
            .with_status(200)
            .with_body(r#"{"id":"668"}"#)
            .create_async()
            .await;
        let _gone = server
            .mock("GET", "/api/v2/channels/gone/chatroom")
            .with_status(404)
            .create_async()
            .await;

        let client = client(&server);
        assert_eq!(client.resolve("alice").await.unwrap(), StreamTarget(668));
        assert!(matches!(
            client.resolve("ghost").await,
            Err(ResolveError::NotFound { .. })
        ));
        assert!(matches!(
            client.resolve("gone").await,
            Err(ResolveError::Status { status: 404 })
        ));
    }
}
