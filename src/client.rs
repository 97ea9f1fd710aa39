//! Jsonmend - OpenAI-compatible chat-completions client
//!
//! Thin typed surface over `POST {base_url}/chat/completions`. No retry
//! policy lives here; callers own that.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Endpoint;

/// One turn of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Per-request knobs. Unset fields are omitted from the wire request so the
/// endpoint's own defaults apply.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub temperature: Option<f64>,
    pub max_completion_tokens: Option<u32>,
    pub reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client bound to one endpoint and model.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: Endpoint,
}

impl ChatClient {
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("jsonmend/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, endpoint })
    }

    pub fn model(&self) -> &str {
        &self.endpoint.model
    }

    /// Issue a chat-completion request and return the assistant text.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &RequestOptions,
    ) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.endpoint.base_url.trim_end_matches('/')
        );
        let request = ChatRequest {
            model: &self.endpoint.model,
            messages,
            temperature: options.temperature,
            max_completion_tokens: options.max_completion_tokens,
            reasoning_effort: options.reasoning_effort.as_deref(),
        };

        debug!("POST {} (model: {})", url, self.endpoint.model);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.endpoint.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Chat request failed for {}", url))?;

        if !resp.status().is_success() {
            bail!("HTTP {} from {}", resp.status(), url);
        }

        let body: ChatResponse = resp
            .json()
            .await
            .with_context(|| "Failed to decode chat-completion response")?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .with_context(|| "Chat-completion response contained no assistant content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_options() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "gpt-oss-20b",
            messages: &messages,
            temperature: Some(1.0),
            max_completion_tokens: None,
            reasoning_effort: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"temperature\":1.0"));
        assert!(!json.contains("max_completion_tokens"));
        assert!(!json.contains("reasoning_effort"));
    }

    #[test]
    fn test_response_content_extraction() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "[]"}, "finish_reason": "stop"}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);
        assert_eq!(content.as_deref(), Some("[]"));
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");
    }
}
