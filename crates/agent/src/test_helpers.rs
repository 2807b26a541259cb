//! Shared test doubles for agent tests.

use async_trait::async_trait;
use scout_core::error::{ProviderError, ToolError};
use scout_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use scout_core::tool::{Tool, ToolRegistry};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Usage every scripted response reports.
pub const STEP_USAGE: Usage = Usage {
    tokens_in: 10,
    tokens_out: 5,
    cost_usd: 0.001,
};

/// A mock provider that returns a sequence of scripted responses and
/// records every request it sees.
///
/// Once the script is exhausted the last response repeats.
pub struct SequentialMockProvider {
    responses: Vec<String>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers every call with the same text.
    pub fn repeating(text: &str) -> Self {
        Self::new([text])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len().min(self.responses.len().saturating_sub(1));
        requests.push(request);
        let content = self
            .responses
            .get(index)
            .cloned()
            .expect("SequentialMockProvider needs at least one response");
        Ok(ProviderResponse {
            content,
            usage: STEP_USAGE,
            model: "mock-model".into(),
        })
    }
}

/// Succeeds for the first `ok_calls` calls, then fails.
pub struct FailingProvider {
    inner: SequentialMockProvider,
    ok_calls: usize,
}

impl FailingProvider {
    pub fn after(ok_calls: usize, script: Vec<&str>) -> Self {
        Self {
            inner: SequentialMockProvider::new(script),
            ok_calls,
        }
    }
}

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if self.inner.call_count() >= self.ok_calls {
            return Err(ProviderError::ApiError {
                status_code: 503,
                message: "service unavailable".into(),
            });
        }
        self.inner.complete(request).await
    }
}

pub struct PanickingProvider;

#[async_trait]
impl Provider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        panic!("provider exploded");
    }
}

/// Never answers.
pub struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes back the input"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "text": { "type": "string", "description": "Text to echo" } },
            "required": ["text"]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("missing 'text'".into()))?;
        Ok(json!({ "tool": "echo", "text": text }))
    }
}

/// Stands in for a registry tool by name, returning canned JSON.
pub struct StubTool {
    pub name: &'static str,
    pub output: Value,
}

#[async_trait]
impl Tool for StubTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "Stub tool"
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Ok(self.output.clone())
    }
}

pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Err(ToolError::failed("failing", "upstream exploded"))
    }
}

pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panicking"
    }
    fn description(&self) -> &str {
        "Panics"
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        panic!("tool blew up");
    }
}

pub struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "Sleeps for an hour"
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(json!({ "tool": "slow" }))
    }
}

pub fn registry_with(tools: Vec<Box<dyn Tool>>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    Arc::new(registry)
}

pub fn stub(name: &'static str) -> Box<dyn Tool> {
    Box::new(StubTool {
        name,
        output: json!({ "tool": name, "success": true }),
    })
}
