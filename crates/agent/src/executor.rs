//! Tool executor: runs one parsed tool call and always returns text.
//!
//! Unknown tools, argument errors, tool failures, timeouts and panics all
//! come back as strings that go into the transcript like any other result,
//! so the model can see its own mistake on the next step.

use futures::FutureExt;
use scout_core::error::ToolError;
use scout_core::tool::{ToolCallRequest, ToolRegistry};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Default wall-clock bound for one tool call.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct ToolExecutor {
    tools: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute `call` and serialize the outcome.
    pub async fn execute(&self, call: &ToolCallRequest) -> String {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, "Unknown tool requested");
            return format!("Error: Unknown tool '{}'", call.name);
        };

        let args = Value::Object(call.args.clone());
        info!(tool = %call.name, args = %args, "Executing tool");
        let started = Instant::now();
        let run = AssertUnwindSafe(tool.execute(args)).catch_unwind();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(Ok(value))) => match serde_json::to_string_pretty(&value) {
                Ok(text) => return finish(call, started, text),
                Err(e) => e.to_string(),
            },
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(panic)) => format!("tool panicked: {}", panic_message(panic.as_ref())),
            Err(_) => ToolError::Timeout {
                tool_name: call.name.clone(),
                timeout_secs: self.timeout.as_secs(),
            }
            .to_string(),
        };

        warn!(tool = %call.name, error = %output, "Tool execution failed");
        finish(call, started, format!("Error executing {}: {output}", call.name))
    }
}

fn finish(call: &ToolCallRequest, started: Instant, text: String) -> String {
    info!(tool = %call.name, elapsed_ms = started.elapsed().as_millis() as u64, chars = text.len(), "Tool finished");
    text
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{registry_with, EchoTool, FailingTool, PanickingTool, SlowTool};
    use serde_json::json;

    fn call(name: &str, args: Value) -> ToolCallRequest {
        ToolCallRequest::new(name, args.as_object().cloned().unwrap_or_default())
    }

    #[tokio::test]
    async fn success_is_pretty_json() {
        let exec = ToolExecutor::new(registry_with(vec![Box::new(EchoTool)]));
        let out = exec.execute(&call("echo", json!({"text": "hi"}))).await;
        assert_eq!(out, "{\n  \"text\": \"hi\",\n  \"tool\": \"echo\"\n}");
    }

    #[tokio::test]
    async fn unknown_tool() {
        let exec = ToolExecutor::new(registry_with(vec![]));
        let out = exec.execute(&call("bogus_tool", json!({}))).await;
        assert_eq!(out, "Error: Unknown tool 'bogus_tool'");
    }

    #[tokio::test]
    async fn tool_error_becomes_text() {
        let exec = ToolExecutor::new(registry_with(vec![Box::new(FailingTool)]));
        let out = exec.execute(&call("failing", json!({}))).await;
        assert!(out.starts_with("Error executing failing: "));
        assert!(out.contains("upstream exploded"));
    }

    #[tokio::test]
    async fn bad_arguments_become_text() {
        let exec = ToolExecutor::new(registry_with(vec![Box::new(EchoTool)]));
        let out = exec.execute(&call("echo", json!({"wrong": 1}))).await;
        assert!(out.starts_with("Error executing echo: Invalid tool arguments"));
    }

    #[tokio::test]
    async fn panic_becomes_text() {
        let exec = ToolExecutor::new(registry_with(vec![Box::new(PanickingTool)]));
        let out = exec.execute(&call("panicking", json!({}))).await;
        assert_eq!(out, "Error executing panicking: tool panicked: tool blew up");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_text() {
        let exec = ToolExecutor::new(registry_with(vec![Box::new(SlowTool)])).with_timeout(Duration::from_secs(5));
        let out = exec.execute(&call("slow", json!({}))).await;
        assert_eq!(out, "Error executing slow: slow timed out after 5s");
    }
}
