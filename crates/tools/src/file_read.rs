//! File read tool: reads a workspace file.

use async_trait::async_trait;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::workspace::Workspace;

pub struct FileReadTool {
    workspace: Arc<Workspace>,
}

impl FileReadTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    path: String,
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the workspace."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Workspace-relative file path" }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;
        Ok(match self.workspace.read_file(&args.path).await {
            Ok(file) => json!({
                "tool": "file_read",
                "success": true,
                "path": file.path,
                "content": file.content,
                "size": file.size,
                "mime_type": file.mime_type,
                "is_binary": file.is_binary,
            }),
            Err(e) => crate::fs_failure("file_read", &e),
        })
    }
}
