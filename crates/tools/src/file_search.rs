//! Recursive workspace search by filename and text content.

use async_trait::async_trait;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::workspace::Workspace;

pub struct FileSearchTool {
    workspace: Arc<Workspace>,
}

impl FileSearchTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    query: String,
    #[serde(default)]
    path: String,
}

#[async_trait]
impl Tool for FileSearchTool {
    fn name(&self) -> &str {
        "file_search"
    }

    fn description(&self) -> &str {
        "Search workspace files by name and text content (case-insensitive)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Text to look for" },
                "path": { "type": "string", "description": "Directory to search in (default: root)" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;
        Ok(match self.workspace.search_files(&args.query, &args.path).await {
            Ok(report) => json!({
                "tool": "file_search",
                "success": true,
                "query": report.query,
                "matches": report.matches,
                "total_matches": report.total_matches,
            }),
            Err(e) => crate::fs_failure("file_search", &e),
        })
    }
}
