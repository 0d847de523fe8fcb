use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info_span, Instrument};

use crate::{CompletionClient, CompletionError, CompletionRequest};

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
}

impl fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: reqwest::Client,
    config: GroqConfig,
}

impl GroqClient {
    pub fn new(client: reqwest::Client, config: GroqConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let span = info_span!("completion", model = %request.model);

        async {
            let response = self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.config.api_key)
                .json(request)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CompletionError::HttpStatus {
                    status: status.as_u16(),
                    body,
                });
            }

            let bytes = response.bytes().await?;
            let envelope: ChatResponse =
                serde_json::from_slice(&bytes).map_err(CompletionError::Decode)?;
            let content = envelope
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or(CompletionError::EmptyResponse)?;

            debug!(chars = content.len(), "completion received");
            Ok(content)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::extraction_request;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> GroqClient {
        GroqClient::new(
            reqwest::Client::new(),
            GroqConfig {
                api_key: "groq-key".to_string(),
                base_url: server.base_url(),
            },
        )
    }

    fn reply(content: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }]
        })
    }

    #[test]
    fn debug_output_hides_the_api_key() {
        let config = GroqConfig {
            api_key: "groq-key".to_string(),
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("groq-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn returns_the_first_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer groq-key")
                    .body_contains(r#""model":"mistral-saba-24b""#)
                    .body_contains(r#""response_format":{"type":"json_object"}"#)
                    .body_contains(r#""stream":false"#);
                then.status(200)
                    .json_body(reply(json!(r#"{"jobTitle":"Engineer"}"#)));
            })
            .await;

        let content = client_for(&server)
            .complete(&extraction_request("mistral-saba-24b", "posting"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(content, r#"{"jobTitle":"Engineer"}"#);
    }

    #[tokio::test]
    async fn empty_choices_and_blank_content_are_empty_responses() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions").body_contains("no-choices");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions").body_contains("blank-content");
                then.status(200).json_body(reply(json!("   ")));
            })
            .await;

        let client = client_for(&server);
        for posting in ["no-choices", "blank-content"] {
            let err = client
                .complete(&extraction_request("m", posting))
                .await
                .unwrap_err();
            assert!(matches!(err, CompletionError::EmptyResponse), "{posting}: {err:?}");
        }
    }

    #[tokio::test]
    async fn non_success_status_keeps_the_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let err = client_for(&server)
            .complete(&extraction_request("m", "posting"))
            .await
            .unwrap_err();
        match err {
            CompletionError::HttpStatus { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_envelope_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).body("<html>gateway</html>");
            })
            .await;

        let err = client_for(&server)
            .complete(&extraction_request("m", "posting"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Decode(_)), "{err:?}");
    }
}
