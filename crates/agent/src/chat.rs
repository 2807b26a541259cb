//! Chat mode: route a request to the agent loop or answer in one turn.

use crate::executor::ToolExecutor;
use crate::loop_runner::AgentLoop;
use crate::parser::{extract_tool_calls, strip_control_markup};
use crate::prompt::SystemPromptBuilder;
use scout_core::message::{Message, Transcript};
use scout_core::provider::{ProviderRequest, Usage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Phrases that suggest the request needs tools.
const TOOL_KEYWORDS: &[&str] = &[
    "list", "show", "read", "write", "save", "create", "edit", "delete", "file", "files",
    "research", "find", "search", "look up", "case study", "case studies",
    "workspace", "directory", "folder", "output", "knowledge base",
    "generate", "build", "make", "produce", "analyze",
    "email", "apollo", "browse",
    "summary", "guidelines", "target companies",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Auto,
    Chat,
    Agent,
}

impl ChatMode {
    /// Decide `Auto` from the latest user message.
    pub fn resolve(self, message: &str) -> ChatMode {
        match self {
            ChatMode::Auto if should_use_agent_mode(message) => ChatMode::Agent,
            ChatMode::Auto => ChatMode::Chat,
            explicit => explicit,
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChatMode::Auto => "auto",
            ChatMode::Chat => "chat",
            ChatMode::Agent => "agent",
        })
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ChatMode::Auto),
            "chat" => Ok(ChatMode::Chat),
            "agent" => Ok(ChatMode::Agent),
            other => Err(format!("unknown chat mode '{other}' (expected auto, chat or agent)")),
        }
    }
}

/// True when the message mentions anything tools are for. Conceptual
/// questions ("what is", "explain") fall through to chat.
pub fn should_use_agent_mode(message: &str) -> bool {
    let lower = message.to_lowercase();
    TOOL_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Result of a single-turn chat.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub message: String,
    pub usage: Usage,
    pub tool_calls: usize,
}

const CHAT_INSTRUCTIONS: &str = r#"You are a research and sales assistant with access to tools. Complete everything in ONE response: there is no second round.

For simple questions, answer directly. When a tool helps, emit one block per tool, several if needed:
<tool>{"name": "file_search", "args": {"query": "hubspot", "path": ""}}</tool>

Check existing workspace files before searching the web."#;

impl AgentLoop {
    /// One completion; every tool block in it runs once and the results
    /// are appended to the reply.
    pub async fn run_single_turn(&self, history: Vec<Message>) -> ChatOutcome {
        let builder =
            SystemPromptBuilder::new(self.tools.clone(), self.workspace.clone(), 1, self.max_tool_calls);
        let prompt = format!(
            "{CHAT_INSTRUCTIONS}\n\nAvailable Tools:\n{}{}",
            builder.tool_docs(),
            builder.file_context_snapshot().await
        );
        let transcript = Transcript::with_system(prompt, history);

        let mut request = ProviderRequest::new(self.model.clone(), transcript.into_messages());
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        let response = match tokio::time::timeout(self.step_timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(provider = self.provider.name(), error = %e, "Single-turn completion failed");
                return ChatOutcome {
                    message: format!("I encountered an error: {e}"),
                    usage: Usage::default(),
                    tool_calls: 0,
                };
            }
            Err(_) => {
                warn!(timeout_secs = self.step_timeout.as_secs(), "Single-turn completion timed out");
                return ChatOutcome {
                    message: format!(
                        "I encountered an error: no response from the language model within {}s",
                        self.step_timeout.as_secs()
                    ),
                    usage: Usage::default(),
                    tool_calls: 0,
                };
            }
        };

        let calls = extract_tool_calls(&response.content);
        let reply = strip_control_markup(&response.content).trim().to_string();
        if calls.is_empty() {
            debug!("Single-turn reply without tools");
            return ChatOutcome {
                message: reply,
                usage: response.usage,
                tool_calls: 0,
            };
        }

        info!(tools = calls.len(), "Executing tools from single-turn reply");
        let executor = ToolExecutor::new(self.tools.clone()).with_timeout(self.tool_timeout);
        let mut results = Vec::with_capacity(calls.len());
        for (i, call) in calls.iter().enumerate() {
            let output = executor.execute(call).await;
            results.push(format!("Tool {}: {}\nResult: {output}", i + 1, call.name));
        }

        ChatOutcome {
            message: format!("{reply}\n\nTool Results:\n{}", results.join("\n\n")),
            usage: response.usage,
            tool_calls: calls.len(),
        }
    }
}
