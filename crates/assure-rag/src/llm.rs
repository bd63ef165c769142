//! Generation client for the Anthropic Messages API
//!
//! A single-turn completion call parameterized by model identifier, system
//! instructions, token ceiling, and user message. No retries, caching, or
//! rate limiting; transient upstream failures surface as
//! [`AssureError::Generation`] and may be retried by the caller.

use assure_core::{AssureError, GenerationClient, LlmConfig, Prompt, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl MessagesResponse {
    /// First non-empty text block, trimmed. An answer with no text content
    /// is a malformed upstream response.
    fn into_answer(self) -> Result<String> {
        self.content
            .into_iter()
            .find(|block| block.kind == "text" && !block.text.trim().is_empty())
            .map(|block| block.text.trim().to_string())
            .ok_or_else(|| {
                AssureError::Generation("empty response from generation API".to_string())
            })
    }
}

impl AnthropicClient {
    /// Create from config. The key's presence was checked at startup.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| AssureError::Config("Anthropic API key required".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AssureError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: prompt.system.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.user.clone(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AssureError::Generation(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssureError::Generation(format!(
                "generation API returned {status}: {error_text}"
            )));
        }

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AssureError::Generation(format!("failed to parse response: {e}")))?;

        result.into_answer()
    }

    fn provider(&self) -> &str {
        "Anthropic Claude"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_key() {
        let config = LlmConfig::default();
        assert!(matches!(
            AnthropicClient::from_config(&config),
            Err(AssureError::Config(_))
        ));

        let config = LlmConfig {
            api_key: Some("sk-ant-test".into()),
            ..Default::default()
        };
        let client = AnthropicClient::from_config(&config).unwrap();
        assert_eq!(client.model, "claude-3-5-sonnet-20240620");
        assert_eq!(client.provider(), "Anthropic Claude");
    }

    #[test]
    fn test_response_answer_extraction() {
        let body = r#"{
            "content": [
                {"type": "tool_use", "text": ""},
                {"type": "text", "text": "  Enable TLS 1.2 or later.  "}
            ]
        }"#;

        let response: MessagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_answer().unwrap(), "Enable TLS 1.2 or later.");
    }

    #[test]
    fn test_empty_response_is_upstream_error() {
        let body = r#"{"content": []}"#;
        let response: MessagesResponse = serde_json::from_str(body).unwrap();
        let err = response.into_answer().unwrap_err();

        assert!(matches!(err, AssureError::Generation(_)));
        assert!(err.is_upstream());
    }

    #[test]
    fn test_whitespace_only_response_is_upstream_error() {
        let body = r#"{"content": [{"type": "text", "text": "   "}]}"#;
        let response: MessagesResponse = serde_json::from_str(body).unwrap();

        assert!(response.into_answer().is_err());
    }
}
