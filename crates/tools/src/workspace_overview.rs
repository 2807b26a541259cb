//! Summary of the well-known workspace directories.

use async_trait::async_trait;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::workspace::{Workspace, WELL_KNOWN_DIRS};

pub struct WorkspaceOverviewTool {
    workspace: Arc<Workspace>,
}

impl WorkspaceOverviewTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WorkspaceOverviewTool {
    fn name(&self) -> &str {
        "workspace_overview"
    }

    fn description(&self) -> &str {
        "Show how many files and folders each standard workspace directory holds."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        if arguments.as_object().is_some_and(|args| !args.is_empty()) {
            return Err(ToolError::InvalidArguments("workspace_overview takes no arguments".into()));
        }

        let mut directories = Map::new();
        for (path, label) in WELL_KNOWN_DIRS {
            let entry = match self.workspace.list_files(path, false).await {
                Ok(listing) => json!({
                    "label": label,
                    "files": listing.total_files,
                    "directories": listing.total_directories,
                }),
                Err(e) => json!({ "label": label, "error": e.to_string() }),
            };
            let key = if path.is_empty() { "/" } else { path };
            directories.insert(key.to_string(), entry);
        }

        Ok(json!({
            "tool": "workspace_overview",
            "success": true,
            "root": self.workspace.root().display().to_string(),
            "directories": directories,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn counts_each_directory() {
        let dir = TempDir::new().unwrap();
        let ws = Arc::new(Workspace::open(dir.path()).unwrap());
        ws.write_file("output/emails/a.md", "a", false).await.unwrap();
        ws.write_file("output/emails/b.md", "b", false).await.unwrap();
        let tool = WorkspaceOverviewTool::new(ws);

        let out = tool.execute(json!({})).await.unwrap();
        assert_eq!(out["directories"]["output/emails"]["files"], 2);
        assert_eq!(out["directories"]["output/emails"]["label"], "Email Drafts");
        assert_eq!(out["directories"]["/"]["directories"], 3);
    }

    #[tokio::test]
    async fn rejects_arguments() {
        let dir = TempDir::new().unwrap();
        let tool = WorkspaceOverviewTool::new(Arc::new(Workspace::open(dir.path()).unwrap()));
        assert!(tool.execute(json!({"path": "x"})).await.is_err());
    }
}
