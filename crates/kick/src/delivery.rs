use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    reqwest::{Client, Proxy, StatusCode, header},
    secrecy::ExposeSecret,
    serde::Serialize,
    tracing::debug,
};

use {
    chorus_common::StreamTarget,
    chorus_config::{Account, KickConfig},
    chorus_session::{DeliveryError, DeliveryService},
};

use crate::channels::USER_AGENT;

#[derive(Serialize)]
struct SendBody<'a> {
    content: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    message_ref: String,
}

/// Posts chat messages as a given account, optionally through a proxy.
///
/// One HTTP client is built per distinct proxy and reused.
pub struct KickDelivery {
    api_base: String,
    timeout: Duration,
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl KickDelivery {
    #[must_use]
    pub fn new(config: &KickConfig) -> Self {
        Self::with_base(&config.api_base, Duration::from_secs(config.send_timeout_secs))
    }

    #[must_use]
    pub fn with_base(api_base: &str, timeout: Duration) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client(&self, proxy: Option<&str>) -> Result<Client, DeliveryError> {
        let key = proxy.map(str::to_string);
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout);
        if let Some(url) = proxy {
            let proxy = Proxy::all(url).map_err(|e| DeliveryError::Proxy {
                proxy: url.to_string(),
                message: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(DeliveryError::transport)?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

fn message_ref() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl DeliveryService for KickDelivery {
    async fn send(
        &self,
        account: &Account,
        proxy: Option<&str>,
        target: StreamTarget,
        content: &str,
    ) -> Result<(), DeliveryError> {
        let client = self.client(proxy)?;
        let url = format!("{}/api/v2/messages/send/{target}", self.api_base);
        let resp = client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(account.auth_token.expose_secret())
            .json(&SendBody {
                content,
                kind: "message",
                message_ref: message_ref(),
            })
            .send()
            .await
            .map_err(DeliveryError::transport)?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            debug!(%target, status = status.as_u16(), body, "send rejected");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chorus_config::credentials::parse_accounts, mockito::Matcher};

    fn account() -> Account {
        parse_accounts("123|abc|streamfan:pw").remove(0)
    }

    #[tokio::test]
    async fn posts_message_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/messages/send/668")
            .match_header("authorization", "Bearer 123|abc")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "content": "gg",
                "type": "message",
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let delivery = KickDelivery::with_base(&server.url(), Duration::from_secs(5));
        delivery
            .send(&account(), None, StreamTarget(668), "gg")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_ok_status_is_a_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/messages/send/668")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let delivery = KickDelivery::with_base(&server.url(), Duration::from_secs(5));
        let err = delivery
            .send(&account(), None, StreamTarget(668), "gg")
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected { status: 429 }));
    }

    #[test]
    fn clients_are_cached_per_proxy() {
        let delivery = KickDelivery::with_base("http://localhost", Duration::from_secs(5));
        delivery.client(None).unwrap();
        delivery.client(None).unwrap();
        delivery.client(Some("http://10.0.0.1:8080")).unwrap();
        assert_eq!(delivery.clients.lock().unwrap().len(), 2);
    }

    #[test]
    fn message_ref_is_unix_millis() {
        let value: u128 = message_ref().parse().unwrap();
        assert!(value > 1_600_000_000_000);
    }
}
