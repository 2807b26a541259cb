//! Anthropic native provider implementation.
//!
//! Uses the Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as a top-level field

use async_trait::async_trait;
use scout_core::error::ProviderError;
use scout_core::message::{Message, Role};
use scout_core::provider::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use crate::pricing::PricingTable;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    pricing: Arc<PricingTable>,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: crate::http_client(std::time::Duration::from_secs(300)),
            pricing: Arc::new(PricingTable::with_defaults()),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url
            .into()
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .to_string();
        self
    }

    pub fn with_pricing(mut self, pricing: Arc<PricingTable>) -> Self {
        self.pricing = pricing;
        self
    }

    /// Extract system messages from the message list.
    /// Anthropic puts the system prompt in a top-level field.
    fn extract_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut rest: Vec<&Message> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                Role::Tool => {}
                _ => rest.push(msg),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, rest)
    }

    /// Anthropic requires alternating roles; consecutive messages from the
    /// same side are merged.
    fn to_api_messages(messages: &[&Message]) -> Vec<AnthropicMessage> {
        let mut out: Vec<AnthropicMessage> = Vec::with_capacity(messages.len());
        for msg in messages {
            let role = if msg.role == Role::Assistant { "assistant" } else { "user" };
            match out.last_mut() {
                Some(last) if last.role == role => {
                    last.content.push_str("\n\n");
                    last.content.push_str(&msg.content);
                }
                _ => out.push(AnthropicMessage {
                    role,
                    content: msg.content.clone(),
                }),
            }
        }
        out
    }

    fn build_response(&self, api: AnthropicResponse) -> ProviderResponse {
        let content = api
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = api
            .usage
            .map(|u| {
                let cost = self.pricing.compute_cost(&api.model, u.input_tokens, u.output_tokens);
                Usage::new(u.input_tokens, u.output_tokens, cost)
            })
            .unwrap_or_default();

        ProviderResponse {
            content,
            usage,
            model: api.model,
        }
    }
}

#[async_trait]
impl scout_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("no API key configured for 'anthropic'".into()));
        }

        let (system, messages) = Self::extract_system(&request.messages);
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&messages),
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature,
        });
        if let Some(system) = system {
            body["system"] = serde_json::json!(system);
        }

        debug!(model = %request.model, messages = messages.len(), "Sending Anthropic request");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic returned error");
            return Err(crate::status_error(status, error_body, &request.model));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Ok(self.build_response(api_response))
    }
}

// ── Wire types ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_with_base_url() {
        let p = AnthropicProvider::new("k").with_base_url("https://api.anthropic.com/v1/");
        assert_eq!(p.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn system_extraction() {
        let messages = vec![
            Message::system("You are scout."),
            Message::user("Hello"),
            Message::new(Role::Tool, "dropped"),
            Message::assistant("Hi"),
        ];
        let (system, rest) = AnthropicProvider::extract_system(&messages);
        assert_eq!(system.as_deref(), Some("You are scout."));
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn system_extraction_no_system() {
        let messages = vec![Message::user("Hello")];
        let (system, rest) = AnthropicProvider::extract_system(&messages);
        assert!(system.is_none());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn consecutive_user_messages_merge() {
        let a = Message::user("first");
        let b = Message::user("Tool result from web_search: {}");
        let c = Message::assistant("ok");
        let api = AnthropicProvider::to_api_messages(&[&a, &b, &c]);
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].role, "user");
        assert!(api[0].content.contains("first\n\nTool result"));
        assert_eq!(api[1].role, "assistant");
    }

    #[test]
    fn parse_text_response() {
        let p = AnthropicProvider::new("k");
        let api: AnthropicResponse = serde_json::from_value(serde_json::json!({
            "model": "claude-3-haiku-20240307",
            "content": [
                { "type": "text", "text": "<think>hm</think>" },
                { "type": "text", "text": "<answer>4</answer>" }
            ],
            "usage": { "input_tokens": 1_000_000, "output_tokens": 1_000_000 }
        }))
        .unwrap();
        let resp = p.build_response(api);
        assert_eq!(resp.content, "<think>hm</think><answer>4</answer>");
        assert_eq!(resp.usage.tokens_out, 1_000_000);
        assert!((resp.usage.cost_usd - 1.5).abs() < 1e-10);
    }
}
