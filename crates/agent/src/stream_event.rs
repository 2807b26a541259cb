//! Agent events.
//!
//! The loop reports progress as `AgentEvent`s. Streaming callers forward
//! them as server-sent events (`data: <json>\n\n`); buffered callers fold
//! them into `AgentStepRecord`s.

use scout_core::provider::Usage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a thought card shown in the client's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Thinking,
    ToolExecution,
    ToolResult,
    FinalAnswer,
    FileWriting,
    FileComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtCard {
    pub card_type: CardType,
    pub step: u32,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl ThoughtCard {
    pub fn new(card_type: CardType, step: u32, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            card_type,
            step,
            title: title.into(),
            content: content.into(),
            tool_name: None,
            tool_args: None,
            result: None,
        }
    }

    pub fn with_tool(mut self, name: impl Into<String>, args: Option<Value>) -> Self {
        self.tool_name = Some(name.into());
        self.tool_args = args;
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }
}

/// Events emitted while the agent runs, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Status { message: String, step: u32 },

    StepStart { step: u32 },

    ThoughtCard(ThoughtCard),

    FinalMessage { content: String },

    FinalUsage { usage: Usage, agent_steps: u32 },

    Error { message: String },
}

impl AgentEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::StepStart { .. } => "step_start",
            Self::ThoughtCard(_) => "thought_card",
            Self::FinalMessage { .. } => "final_message",
            Self::FinalUsage { .. } => "final_usage",
            Self::Error { .. } => "error",
        }
    }

    /// JSON body of the event.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "type": "error", "message": format!("event serialization failed: {e}") })
                .to_string()
        })
    }

    /// One SSE frame: `data: <json>\n\n`.
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinalUsage { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Thinking,
    ToolExecution,
    ToolResult,
    FinalAnswer,
    Status,
    Error,
}

/// Buffered-mode record of one observable thing the agent did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStepRecord {
    pub step: u32,
    pub kind: StepKind,
    pub payload: Value,
}

impl AgentStepRecord {
    /// Record for `event`, if it is one callers keep. `step` is used for
    /// events that do not carry their own step.
    pub fn from_event(event: &AgentEvent, step: u32) -> Option<Self> {
        let (step, kind) = match event {
            AgentEvent::Status { step, .. } => (*step, StepKind::Status),
            AgentEvent::Error { .. } => (step, StepKind::Error),
            AgentEvent::ThoughtCard(card) => {
                let kind = match card.card_type {
                    CardType::Thinking => StepKind::Thinking,
                    CardType::ToolExecution => StepKind::ToolExecution,
                    CardType::ToolResult => StepKind::ToolResult,
                    CardType::FinalAnswer => StepKind::FinalAnswer,
                    CardType::FileWriting | CardType::FileComplete => return None,
                };
                (card.step, kind)
            }
            AgentEvent::StepStart { .. } | AgentEvent::FinalMessage { .. } | AgentEvent::FinalUsage { .. } => {
                return None;
            }
        };
        let payload = serde_json::to_value(event).unwrap_or(Value::Null);
        Some(Self { step, kind, payload })
    }
}
