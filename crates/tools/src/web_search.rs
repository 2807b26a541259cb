//! Web search tool backed by Brave Search.

use async_trait::async_trait;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::search::SearchBackend;

const TOP_RESULTS: usize = 3;

pub struct WebSearchTool {
    backend: Option<Arc<dyn SearchBackend>>,
    default_count: u32,
}

impl WebSearchTool {
    pub fn new(backend: Option<Arc<dyn SearchBackend>>, default_count: u32) -> Self {
        Self {
            backend,
            default_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    query: String,
    #[serde(default)]
    count: Option<u32>,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information about companies, people, products or topics."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The search query" },
                "count": { "type": "integer", "description": "How many results to fetch (default 5)" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;

        let Some(backend) = &self.backend else {
            return Ok(json!({
                "tool": "web_search",
                "query": args.query,
                "error": "Brave Search is not available. Please configure BRAVE_API_KEY environment variable.",
            }));
        };

        let count = args.count.unwrap_or(self.default_count).clamp(1, 20);
        match backend.search(&args.query, count).await {
            Ok(hits) => Ok(json!({
                "tool": "web_search",
                "query": args.query,
                "total_found": hits.len(),
                "results": hits.into_iter().take(TOP_RESULTS).collect::<Vec<_>>(),
            })),
            Err(e) => {
                warn!(query = %args.query, error = %e, "Web search failed");
                Ok(json!({
                    "tool": "web_search",
                    "query": args.query,
                    "error": format!("Search failed: {e}"),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::{hit, FixedSearch};

    #[tokio::test]
    async fn returns_top_three_and_total() {
        let hits = (1..=5)
            .map(|i| hit(&format!("Result {i}"), &format!("https://r{i}.io"), "d"))
            .collect();
        let tool = WebSearchTool::new(Some(Arc::new(FixedSearch::new(hits))), 5);
        let out = tool.execute(json!({"query": "acme funding"})).await.unwrap();
        assert_eq!(out["tool"], "web_search");
        assert_eq!(out["total_found"], 5);
        assert_eq!(out["results"].as_array().unwrap().len(), 3);
        assert_eq!(out["results"][0]["title"], "Result 1");
    }

    #[tokio::test]
    async fn unconfigured_backend_reports_error() {
        let tool = WebSearchTool::new(None, 5);
        let out = tool.execute(json!({"query": "x"})).await.unwrap();
        assert!(out["error"].as_str().unwrap().contains("BRAVE_API_KEY"));
    }

    #[tokio::test]
    async fn unknown_arguments_are_rejected() {
        let tool = WebSearchTool::new(None, 5);
        let err = tool.execute(json!({"q": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
