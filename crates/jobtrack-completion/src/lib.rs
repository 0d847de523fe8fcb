//! Chat-completion access for jobtrack: request types, the client capability
//! and parsing of JSON-object replies.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub mod groq;
pub mod prompts;

pub use groq::{GroqClient, GroqConfig};

pub const CRATE_NAME: &str = "jobtrack-completion";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion endpoint returned http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("completion response had no choices or empty content")]
    EmptyResponse,
    #[error("decoding completion envelope: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("completion content is not the expected JSON object: {0}")]
    MalformedPayload(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body of a non-streaming chat completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    /// Non-streaming request constrained to a single JSON object reply.
    pub fn json_object(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        }
    }
}

/// Sends one chat completion and returns the text of the first choice.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Decode the model's reply into `T`. A surrounding markdown code fence is tolerated.
pub fn parse_json_payload<T: DeserializeOwned>(content: &str) -> Result<T, CompletionError> {
    serde_json::from_str(strip_code_fence(content)).map_err(CompletionError::MalformedPayload)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobtrack_core::{ExtractedJob, JobComparison};

    #[test]
    fn json_object_request_serializes_like_the_wire_format() {
        let request = CompletionRequest::json_object(
            "mistral-saba-24b",
            vec![ChatMessage::system("sys"), ChatMessage::user("hello")],
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "mistral-saba-24b",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "hello" }
                ],
                "stream": false,
                "response_format": { "type": "json_object" }
            })
        );
    }

    #[test]
    fn payload_parsing_handles_plain_and_fenced_json() {
        let plain: ExtractedJob = parse_json_payload(
            r#"{"jobTitle":"Engineer","company":"Acme","country":"Canada","description":"- Rust"}"#,
        )
        .unwrap();
        assert_eq!(plain.title, "Engineer");

        let fenced: JobComparison =
            parse_json_payload("```json\n{\"matchScore\":\"64\",\"missingSkills\":[\"Kafka\"]}\n```")
                .unwrap();
        assert_eq!(fenced.match_score, 64);
        assert_eq!(fenced.missing_skills, vec!["Kafka".to_string()]);
    }

    #[test]
    fn non_json_content_is_a_malformed_payload() {
        let err = parse_json_payload::<ExtractedJob>("Sorry, I can't help with that.").unwrap_err();
        assert!(matches!(err, CompletionError::MalformedPayload(_)), "{err:?}");

        let err = parse_json_payload::<JobComparison>(r#"{"missingSkills":[]}"#).unwrap_err();
        assert!(matches!(err, CompletionError::MalformedPayload(_)), "{err:?}");
    }
}
