//! File write tool: creates, overwrites or appends to a workspace file.

use async_trait::async_trait;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::workspace::Workspace;

pub struct FileWriteTool {
    workspace: Arc<Workspace>,
}

impl FileWriteTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    path: String,
    content: String,
    #[serde(default)]
    append: bool,
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a workspace file. Creates parent directories; set append to add to the end."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Workspace-relative file path" },
                "content": { "type": "string", "description": "Text to write" },
                "append": { "type": "boolean", "description": "Append instead of overwrite (default false)" }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;
        Ok(match self.workspace.write_file(&args.path, &args.content, args.append).await {
            Ok(receipt) => json!({
                "tool": "file_write",
                "success": true,
                "path": receipt.path,
                "size": receipt.size,
                "mode": receipt.mode,
            }),
            Err(e) => crate::fs_failure("file_write", &e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_and_appends() {
        let dir = TempDir::new().unwrap();
        let tool = FileWriteTool::new(Arc::new(Workspace::open(dir.path()).unwrap()));

        let out = tool
            .execute(json!({"path": "output/context/notes.md", "content": "a"}))
            .await
            .unwrap();
        assert_eq!(out["mode"], "write");

        let out = tool
            .execute(json!({"path": "output/context/notes.md", "content": "b", "append": true}))
            .await
            .unwrap();
        assert_eq!(out["mode"], "append");
        assert_eq!(out["size"], 2);
        assert_eq!(std::fs::read_to_string(dir.path().join("output/context/notes.md")).unwrap(), "ab");
    }

    #[tokio::test]
    async fn missing_content_is_invalid_arguments() {
        let dir = TempDir::new().unwrap();
        let tool = FileWriteTool::new(Arc::new(Workspace::open(dir.path()).unwrap()));
        let err = tool.execute(json!({"path": "x.md"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
