//! Provider trait: the abstraction over completion backends.
//!
//! A Provider takes a transcript and a model identifier and returns the
//! assistant text plus what the call consumed. Retries, if any, are the
//! provider's own business; the agent loop calls `complete` exactly once per
//! step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// One completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o-mini", "claude-3-5-haiku-20241022")
    pub model: String,

    /// The full transcript, system prompt first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Raw assistant text, markup included
    pub content: String,

    /// Tokens and cost of this single call
    #[serde(default)]
    pub usage: Usage,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token and cost accounting.
///
/// Summed across every provider call of one agent invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
}

impl Usage {
    pub fn new(tokens_in: u64, tokens_out: u64, cost_usd: f64) -> Self {
        Self {
            tokens_in,
            tokens_out,
            cost_usd,
        }
    }

    /// Add another call's usage into this running total.
    pub fn accumulate(&mut self, other: &Usage) {
        self.tokens_in += other.tokens_in;
        self.tokens_out += other.tokens_out;
        self.cost_usd += other.cost_usd;
    }

    pub fn total_tokens(&self) -> u64 {
        self.tokens_in + self.tokens_out
    }
}

/// A tool definition advertised to the model through the system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// The core Provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_request_defaults() {
        let req = ProviderRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn usage_accumulates_by_summation() {
        let step = Usage::new(120, 40, 0.25);
        let mut total = Usage::default();
        for _ in 0..3 {
            total.accumulate(&step);
        }
        assert_eq!(total, Usage::new(360, 120, 0.75));
        assert_eq!(total.total_tokens(), 480);
    }

    #[test]
    fn missing_usage_deserializes_as_zero() {
        let resp: ProviderResponse =
            serde_json::from_str(r#"{"content":"hello","model":"m"}"#).unwrap();
        assert_eq!(resp.usage, Usage::default());
    }
}
