//! File edit tool: find-and-replace inside a workspace file.

use async_trait::async_trait;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::workspace::Workspace;

pub struct FileEditTool {
    workspace: Arc<Workspace>,
}

impl FileEditTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    path: String,
    old_text: String,
    new_text: String,
}

#[async_trait]
impl Tool for FileEditTool {
    fn name(&self) -> &str {
        "file_edit"
    }

    fn description(&self) -> &str {
        "Replace every occurrence of old_text with new_text in a workspace file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Workspace-relative file path" },
                "old_text": { "type": "string", "description": "Exact text to find" },
                "new_text": { "type": "string", "description": "Replacement text" }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;
        Ok(
            match self.workspace.edit_file(&args.path, &args.old_text, &args.new_text).await {
                Ok(receipt) => json!({
                    "tool": "file_edit",
                    "success": true,
                    "path": receipt.path,
                    "replacements": receipt.replacements,
                    "size": receipt.size,
                }),
                Err(e) => crate::fs_failure("file_edit", &e),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn edits_and_reports_missing_text() {
        let dir = TempDir::new().unwrap();
        let ws = Arc::new(Workspace::open(dir.path()).unwrap());
        ws.write_file("output/emails/draft.md", "Dear NAME", false).await.unwrap();
        let tool = FileEditTool::new(ws);

        let out = tool
            .execute(json!({"path": "output/emails/draft.md", "old_text": "NAME", "new_text": "Ana"}))
            .await
            .unwrap();
        assert_eq!(out["replacements"], 1);

        let out = tool
            .execute(json!({"path": "output/emails/draft.md", "old_text": "NAME", "new_text": "Ana"}))
            .await
            .unwrap();
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "Text 'NAME' not found in file");
    }
}
