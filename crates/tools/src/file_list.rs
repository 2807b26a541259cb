//! Directory listing tool.

use async_trait::async_trait;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::workspace::Workspace;

pub struct FileListTool {
    workspace: Arc<Workspace>,
}

impl FileListTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    #[serde(default)]
    path: String,
}

#[async_trait]
impl Tool for FileListTool {
    fn name(&self) -> &str {
        "file_list"
    }

    fn description(&self) -> &str {
        "List files and directories at a workspace path (default: the workspace root)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Workspace-relative directory" }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;
        Ok(match self.workspace.list_files(&args.path, false).await {
            Ok(listing) => json!({
                "tool": "file_list",
                "success": true,
                "path": listing.path,
                "files": listing.files,
                "directories": listing.directories,
                "total_files": listing.total_files,
                "total_directories": listing.total_directories,
            }),
            Err(e) => crate::fs_failure("file_list", &e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn lists_root_by_default() {
        let dir = TempDir::new().unwrap();
        let tool = FileListTool::new(Arc::new(Workspace::open(dir.path()).unwrap()));
        let out = tool.execute(json!({})).await.unwrap();
        assert_eq!(out["success"], true);
        let dirs: Vec<&str> = out["directories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(dirs, vec!["knowledge_base", "logs", "output"]);
    }
}
