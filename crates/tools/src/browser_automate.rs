//! Browser automation through an external service.
//!
//! The headless browser runs elsewhere; this tool only posts the task and
//! waits (minutes, potentially) for `{success, result, screenshot?, error?}`.

use async_trait::async_trait;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

pub struct BrowserAutomateTool {
    endpoint: Option<String>,
    default_timeout: Duration,
    client: reqwest::Client,
}

impl BrowserAutomateTool {
    pub fn new(endpoint: Option<String>, default_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
            default_timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    task: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AutomationRequest<'a> {
    task: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct AutomationResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    screenshot: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn failure(error: impl Into<String>) -> Value {
    json!({ "tool": "browser_automate", "success": false, "error": error.into() })
}

#[async_trait]
impl Tool for BrowserAutomateTool {
    fn name(&self) -> &str {
        "browser_automate"
    }

    fn description(&self) -> &str {
        "Run a browsing task in a headless browser (navigate, read pages, fill forms) and return what it found."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task": { "type": "string", "description": "Plain-language instructions for the browser" },
                "url": { "type": "string", "description": "Starting URL (optional)" },
                "timeout_secs": { "type": "integer", "description": "Upper bound on the run in seconds" }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;
        let Some(endpoint) = &self.endpoint else {
            return Ok(failure(
                "Browser automation is not configured. Set BROWSER_AUTOMATION_URL to enable it.",
            ));
        };

        let timeout = args
            .timeout_secs
            .map(Duration::from_secs)
            .map_or(self.default_timeout, |t| t.min(self.default_timeout));
        info!(task = %args.task, timeout_secs = timeout.as_secs(), "Starting browser task");

        let response = self
            .client
            .post(endpoint)
            .timeout(timeout)
            .json(&AutomationRequest {
                task: &args.task,
                url: args.url.as_deref(),
            })
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Ok(failure(format!("Browser task timed out after {}s", timeout.as_secs())));
            }
            Err(e) => return Ok(failure(format!("Browser service unreachable: {e}"))),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Browser service returned error");
            return Ok(failure(format!("Browser service returned {status}: {body}")));
        }

        let body: AutomationResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => return Ok(failure(format!("Invalid browser service response: {e}"))),
        };

        let mut out = json!({
            "tool": "browser_automate",
            "success": body.success,
            "task": args.task,
            "result": body.result,
        });
        if let Some(screenshot) = body.screenshot {
            out["screenshot"] = json!(screenshot);
        }
        if let Some(error) = body.error {
            out["error"] = json!(error);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_is_a_failure_result() {
        let tool = BrowserAutomateTool::new(None, Duration::from_secs(600));
        let out = tool.execute(json!({"task": "open acme.com"})).await.unwrap();
        assert_eq!(out["tool"], "browser_automate");
        assert_eq!(out["success"], false);
        assert!(out["error"].as_str().unwrap().contains("BROWSER_AUTOMATION_URL"));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_failure_result() {
        let tool = BrowserAutomateTool::new(Some("http://127.0.0.1:9/run".into()), Duration::from_secs(2));
        let out = tool.execute(json!({"task": "x"})).await.unwrap();
        assert_eq!(out["success"], false);
    }

    #[test]
    fn response_fields_default() {
        let body: AutomationResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(body.success);
        assert!(body.screenshot.is_none());
    }
}
