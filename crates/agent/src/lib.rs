//! The scout agent.
//!
//! A request runs through a bounded **think → act → observe** loop:
//!
//! 1. **Prompt**: system prompt with tool docs and a live workspace listing
//! 2. **Complete**: one provider call per step
//! 3. **Parse**: `<think>`, `<tool>` and `<answer>` blocks from the reply
//! 4. **Act**: run at most one tool per step, feed its result back
//! 5. **Stop** on an answer, or abort on a step, tool-call or duplicate bound
//!
//! Buffered callers use [`AgentLoop::run`]; streaming callers use
//! [`AgentLoop::run_stream`] and receive [`AgentEvent`]s as they happen.

pub mod chat;
pub mod executor;
pub mod loop_runner;
pub mod parser;
pub mod prompt;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use chat::{should_use_agent_mode, ChatMode, ChatOutcome};
pub use executor::ToolExecutor;
pub use loop_runner::{AbortReason, AgentLoop, AgentOutcome, EventSink, Termination};
pub use parser::{parse_response, ParsedResponse};
pub use prompt::SystemPromptBuilder;
pub use stream_event::{AgentEvent, AgentStepRecord, CardType, StepKind, ThoughtCard};
