//! Built-in tools for scout.
//!
//! Everything the agent can do to the outside world lives here: web and
//! case-study search, the sandboxed file workspace, email drafting, Apollo
//! exports and remote browser automation. `build_registry` wires them all
//! from configuration once at startup.

pub mod apollo_process;
pub mod browser_automate;
pub mod case_study;
pub mod email;
pub mod email_write;
pub mod file_edit;
pub mod file_list;
pub mod file_read;
pub mod file_search;
pub mod file_write;
pub mod save_as_markdown;
pub mod search;
pub mod web_search;
pub mod workspace;
pub mod workspace_overview;

use scout_config::AppConfig;
use scout_core::error::ToolError;
use scout_core::tool::ToolRegistry;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use email::{Mailer, SendGridMailer};
pub use search::{BraveSearch, SearchBackend, SearchHit};
pub use workspace::{FsError, FsResponse, Workspace, WELL_KNOWN_DIRS};

/// Names of tools that create or modify workspace files.
pub const FILE_PRODUCING_TOOLS: &[&str] = &["file_write", "file_edit", "email_write", "save_as_markdown"];

/// Decode tool arguments into their typed form.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// The `{tool, success: false, error}` shape for workspace failures.
pub(crate) fn fs_failure(tool: &str, err: &FsError) -> Value {
    json!({ "tool": tool, "success": false, "error": err.to_string() })
}

/// Build the registry with every built-in tool.
///
/// Search, email and browser tools are always registered; when their service
/// is not configured they answer with an error result instead.
pub fn build_registry(config: &AppConfig, workspace: Arc<Workspace>) -> ToolRegistry {
    let search: Option<Arc<dyn SearchBackend>> = config
        .search
        .brave_api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(|k| Arc::new(BraveSearch::new(k)) as Arc<dyn SearchBackend>);

    let mailer: Option<Arc<dyn Mailer>> = match (&config.email.sendgrid_api_key, &config.email.from_address) {
        (Some(key), Some(from)) if !key.is_empty() && !from.is_empty() => {
            Some(Arc::new(SendGridMailer::new(key, from)))
        }
        _ => None,
    };

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(web_search::WebSearchTool::new(
        search.clone(),
        config.search.results_per_query,
    )));
    registry.register(Box::new(case_study::CaseStudyLookupTool::new(search.clone())));
    registry.register(Box::new(file_read::FileReadTool::new(workspace.clone())));
    registry.register(Box::new(file_write::FileWriteTool::new(workspace.clone())));
    registry.register(Box::new(file_edit::FileEditTool::new(workspace.clone())));
    registry.register(Box::new(file_list::FileListTool::new(workspace.clone())));
    registry.register(Box::new(file_search::FileSearchTool::new(workspace.clone())));
    registry.register(Box::new(workspace_overview::WorkspaceOverviewTool::new(workspace.clone())));
    registry.register(Box::new(email_write::EmailWriteTool::new(workspace.clone(), mailer.clone())));
    registry.register(Box::new(save_as_markdown::SaveAsMarkdownTool::new(
        search.clone(),
        workspace.clone(),
    )));
    registry.register(Box::new(apollo_process::ApolloProcessTool::new(workspace)));
    registry.register(Box::new(browser_automate::BrowserAutomateTool::new(
        config.browser.endpoint.clone(),
        Duration::from_secs(config.browser.timeout_secs),
    )));

    info!(
        tools = registry.len(),
        search = search.is_some(),
        email = mailer.is_some(),
        browser = config.browser.endpoint.is_some(),
        "Tool registry ready"
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn registry_has_all_tools_in_prompt_order() {
        let dir = TempDir::new().unwrap();
        let ws = Arc::new(Workspace::open(dir.path()).unwrap());
        let registry = build_registry(&AppConfig::default(), ws);
        assert_eq!(
            registry.names(),
            vec![
                "web_search",
                "case_study_lookup",
                "file_read",
                "file_write",
                "file_edit",
                "file_list",
                "file_search",
                "workspace_overview",
                "email_write",
                "save_as_markdown",
                "apollo_process",
                "browser_automate",
            ]
        );
    }

    #[test]
    fn every_definition_has_an_object_schema() {
        let dir = TempDir::new().unwrap();
        let ws = Arc::new(Workspace::open(dir.path()).unwrap());
        for def in build_registry(&AppConfig::default(), ws).definitions() {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }

    #[tokio::test]
    async fn registry_dispatches_to_workspace_tools() {
        let dir = TempDir::new().unwrap();
        let ws = Arc::new(Workspace::open(dir.path()).unwrap());
        let registry = build_registry(&AppConfig::default(), ws);

        let tool = registry.get("file_write").unwrap();
        let out = tool
            .execute(json!({"path": "output/a.md", "content": "hi"}))
            .await
            .unwrap();
        assert_eq!(out["success"], true);
    }
}
