//! System prompt assembly.
//!
//! The prompt is rebuilt for every agent invocation because it embeds a
//! live listing of the workspace.

use scout_core::tool::ToolRegistry;
use scout_tools::workspace::{Workspace, WELL_KNOWN_DIRS};
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// Files shown per directory in the workspace snapshot.
const FILES_PER_DIR: usize = 10;

const PREAMBLE: &str = "You are a research and sales assistant that can use web search and \
workspace file tools when needed. You can chain several tools across multiple steps to \
complete a task, then give the user a final answer.";

const WORKFLOW: &str = "\
TOOL SELECTION:
- For general questions you can answer directly, answer WITHOUT using tools.
- Check existing workspace files (file_search, file_read) before searching the web.
- Use case_study_lookup or save_as_markdown for case studies about a specific company.
- Use web_search for current events and specific research queries.
- Use email_write for email drafts; include links as markdown, never raw URLs.
- For follow-up questions about a file you just created, read that file instead of redoing the research.";

const PROTOCOL: &str = r#"RESPONSE FORMAT:

<think>
Your reasoning about what to do next. If you just received tool results, decide whether you need more information or can answer.
</think>

<tool>
{"name": "web_search", "args": {"query": "your search query"}}
</tool>

OR, when you have enough information:

<answer>
Your final answer. Include source URLs as markdown links [title](url).
</answer>

If the information you have answers the question, you MUST reply with an <answer> block instead of thinking again."#;

/// Builds the agent's system prompt from the tool registry and workspace.
#[derive(Clone)]
pub struct SystemPromptBuilder {
    tools: Arc<ToolRegistry>,
    workspace: Arc<Workspace>,
    max_steps: u32,
    max_tool_calls: usize,
}

impl SystemPromptBuilder {
    pub fn new(tools: Arc<ToolRegistry>, workspace: Arc<Workspace>, max_steps: u32, max_tool_calls: usize) -> Self {
        Self {
            tools,
            workspace,
            max_steps,
            max_tool_calls,
        }
    }

    pub async fn build_system_prompt(&self) -> String {
        let mut prompt = String::with_capacity(4096);
        prompt.push_str(PREAMBLE);
        prompt.push_str("\n\nAvailable Tools:\n");
        prompt.push_str(&self.tool_docs());
        prompt.push('\n');
        prompt.push_str(WORKFLOW);
        prompt.push_str("\n\n");
        prompt.push_str(PROTOCOL);
        prompt.push('\n');
        prompt.push_str(&self.file_context_snapshot().await);
        prompt.push('\n');
        prompt.push_str(&self.rules());
        prompt
    }

    /// One line per registered tool with its argument names.
    pub fn tool_docs(&self) -> String {
        let mut docs = String::new();
        for def in self.tools.definitions() {
            let args = def
                .parameters
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(key, schema)| {
                            let hint = schema.get("description").and_then(Value::as_str).unwrap_or(key);
                            format!("\"{key}\": \"{hint}\"")
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            let _ = writeln!(docs, "- {}: {} Args: {{{args}}}", def.name, def.description);
        }
        docs
    }

    /// Bounded listing of the well-known workspace directories.
    ///
    /// A directory that cannot be listed is left out.
    pub async fn file_context_snapshot(&self) -> String {
        let mut out = String::from("\nCURRENT WORKSPACE FILES:\n");
        for (dir, label) in WELL_KNOWN_DIRS {
            let listing = match self.workspace.list_files(dir, false).await {
                Ok(listing) => listing,
                Err(e) => {
                    debug!(dir, error = %e, "Skipping directory in workspace snapshot");
                    continue;
                }
            };
            if listing.files.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{label}:");
            for file in listing.files.iter().take(FILES_PER_DIR) {
                let _ = writeln!(out, "  - {} ({:.1}KB)", file.name, file.size as f64 / 1024.0);
            }
            if listing.files.len() > FILES_PER_DIR {
                let _ = writeln!(out, "  ... and {} more files", listing.files.len() - FILES_PER_DIR);
            }
        }
        out.push_str(
            "\nUse file_read to open a file, file_search to find one by name, and file_list \
             with path \"\" for the full workspace structure.\n",
        );
        out
    }

    fn rules(&self) -> String {
        format!(
            "RULES:
1. Start every response with a <think> block.
2. Maximum {} steps in total.
3. Maximum {} tool calls; after that you MUST give your final answer.
4. Do NOT repeat a tool call with the same arguments; use a different tool or answer.
5. After search results arrive, usually answer rather than searching again.
6. When mentioning saved files, use only the file name, not the full path.
7. Always include source URLs as markdown links in answers, documents and emails.",
            self.max_steps, self.max_tool_calls
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{registry_with, EchoTool};
    use tempfile::TempDir;

    fn builder(dir: &TempDir) -> SystemPromptBuilder {
        let ws = Arc::new(Workspace::open(dir.path()).unwrap());
        SystemPromptBuilder::new(registry_with(vec![Box::new(EchoTool)]), ws, 10, 5)
    }

    #[tokio::test]
    async fn prompt_documents_tools_protocol_and_limits() {
        let dir = TempDir::new().unwrap();
        let prompt = builder(&dir).build_system_prompt().await;

        assert!(prompt.contains("- echo: Echoes back the input Args: {\"text\": \"Text to echo\"}"));
        assert!(prompt.contains("<think>"));
        assert!(prompt.contains(r#"{"name": "web_search", "args": {"query": "your search query"}}"#));
        assert!(!prompt.contains("{{"));
        assert!(prompt.contains("Maximum 10 steps"));
        assert!(prompt.contains("Maximum 5 tool calls"));
    }

    #[tokio::test]
    async fn snapshot_lists_files_per_directory() {
        let dir = TempDir::new().unwrap();
        let b = builder(&dir);
        b.workspace.write_file("output/emails/hello.md", "hi", false).await.unwrap();

        let snapshot = b.file_context_snapshot().await;
        assert!(snapshot.contains("Email Drafts:\n  - hello.md (0.0KB)"));
        assert!(!snapshot.contains("Slides:"));
    }

    #[tokio::test]
    async fn snapshot_caps_entries_per_directory() {
        let dir = TempDir::new().unwrap();
        let b = builder(&dir);
        for i in 0..13 {
            b.workspace
                .write_file(&format!("knowledge_base/doc{i:02}.md"), "x", false)
                .await
                .unwrap();
        }

        let snapshot = b.file_context_snapshot().await;
        assert_eq!(snapshot.matches("  - doc").count(), 10);
        assert!(snapshot.contains("... and 3 more files"));
    }

    #[tokio::test]
    async fn snapshot_skips_unlistable_directories() {
        let dir = TempDir::new().unwrap();
        let b = builder(&dir);
        std::fs::remove_dir_all(dir.path().join("logs")).unwrap();
        std::fs::write(dir.path().join("logs"), "not a directory").unwrap();

        let snapshot = b.file_context_snapshot().await;
        assert!(snapshot.starts_with("\nCURRENT WORKSPACE FILES:\n"));
        assert!(!snapshot.contains("Logs:"));
        assert!(snapshot.contains("Root:"));
    }
}
