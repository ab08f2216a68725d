use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::{debug, info},
};

use {
    chorus_common::ChatRecord,
    chorus_config::GenerationConfig,
    chorus_session::{GenerationError, GenerationService},
};

use crate::prompt::build_prompt;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [RequestMessage; 1],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`GenerationService`] backed by an OpenAI-compatible chat completions
/// endpoint.
pub struct OpenRouterGenerator {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Secret<String>,
    batch_size: usize,
    window: Duration,
}

impl OpenRouterGenerator {
    /// `window` is the chat collection interval mentioned in the prompt.
    pub fn new(config: &GenerationConfig, window: Duration) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            batch_size: config.batch_size,
            window,
        })
    }
}

#[async_trait]
impl GenerationService for OpenRouterGenerator {
    async fn generate(&self, history: &[ChatRecord]) -> Result<Vec<String>, GenerationError> {
        if history.is_empty() {
            return Ok(Vec::new());
        }

        let request = ChatRequest {
            model: &self.model,
            messages: [RequestMessage {
                role: "user",
                content: build_prompt(history, self.window, self.batch_size),
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        debug!(model = %self.model, history = history.len(), "requesting generation");

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::InvalidOutput(e.to_string()))?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidOutput("response had no content".into()))?;

        let messages = parse_messages(&content)?;
        info!(model = %self.model, generated = messages.len(), "generated messages");
        Ok(messages)
    }
}

/// Accepts a bare JSON array of strings, or an object holding one under
/// `messages`. Markdown code fences around the JSON are tolerated.
pub fn parse_messages(content: &str) -> Result<Vec<String>, GenerationError> {
    let trimmed = strip_fence(content.trim());
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| GenerationError::InvalidOutput(format!("{e}: {trimmed}")))?;

    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("messages") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(GenerationError::InvalidOutput(
                    "object has no messages array".into(),
                ));
            },
        },
        other => {
            return Err(GenerationError::InvalidOutput(format!(
                "expected a list, got {other}"
            )));
        },
    };

    list.into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(GenerationError::InvalidOutput(format!(
                "non-string message: {other}"
            ))),
        })
        .collect()
}

fn strip_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, rstest::rstest};

    fn generator(server: &mockito::Server) -> OpenRouterGenerator {
        let config = GenerationConfig {
            api_key: Secret::new("sk-test".into()),
            endpoint: format!("{}/api/v1/chat/completions", server.url()),
            ..Default::default()
        };
        OpenRouterGenerator::new(&config, Duration::from_secs(30)).unwrap()
    }

    fn completion(content: &str) -> String {
        serde_json::json!({
            "id": "gen-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    fn history() -> Vec<ChatRecord> {
        vec![ChatRecord::new("1", "that was insane", "viewer", "")]
    }

    #[rstest]
    #[case(r#"["gg", "lol"]"#)]
    #[case(r#"{"messages": ["gg", "lol"]}"#)]
    #[case("```json\n[\"gg\", \"lol\"]\n```")]
    fn parses_accepted_shapes(#[case] content: &str) {
        assert_eq!(parse_messages(content).unwrap(), vec!["gg", "lol"]);
    }

    #[rstest]
    #[case("sure, here you go")]
    #[case(r#"{"replies": ["gg"]}"#)]
    #[case(r#"["gg", 42]"#)]
    #[case(r#""gg""#)]
    fn rejects_other_output(#[case] content: &str) {
        assert!(matches!(
            parse_messages(content),
            Err(GenerationError::InvalidOutput(_))
        ));
    }

    #[tokio::test]
    async fn empty_history_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        assert!(generator(&server).generate(&[]).await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn sends_prompt_and_parses_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "google/gemini-2.5-flash",
                "response_format": {"type": "json_object"},
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(r#"{"messages": ["gg", "W streamer", ""]}"#))
            .create_async()
            .await;

        let messages = generator(&server).generate(&history()).await.unwrap();
        assert_eq!(messages, vec!["gg", "W streamer", ""]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/chat/completions")
            .with_status(402)
            .with_body(r#"{"error":"insufficient credits"}"#)
            .create_async()
            .await;

        let err = generator(&server).generate(&history()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Status { status: 402, .. }));
        assert!(err.to_string().contains("insufficient credits"));
    }

    #[tokio::test]
    async fn missing_choices_is_invalid_output() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        assert!(matches!(
            generator(&server).generate(&history()).await,
            Err(GenerationError::InvalidOutput(_))
        ));
    }
}
