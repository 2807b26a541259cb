//! The agent loop: a bounded state machine over provider calls and tools.
//!
//! Each step calls the provider once, records the raw reply, parses it and
//! then either executes one tool, finishes with an answer, or aborts. The
//! same `drive` core serves both the buffered `run` and the streaming
//! `run_stream`; they differ only in the `EventSink` they hand it.

use crate::executor::{panic_message, ToolExecutor, DEFAULT_TOOL_TIMEOUT};
use crate::parser::{parse_response, ParsedResponse};
use crate::prompt::SystemPromptBuilder;
use crate::stream_event::{AgentEvent, AgentStepRecord, CardType, ThoughtCard};
use async_trait::async_trait;
use futures::FutureExt;
use scout_config::AppConfig;
use scout_core::message::{Message, Transcript};
use scout_core::provider::{Provider, ProviderRequest, Usage};
use scout_core::tool::{ToolCallRequest, ToolRegistry};
use scout_tools::{Workspace, FILE_PRODUCING_TOOLS};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Characters of a tool result shown in a `tool_result` card.
const RESULT_PREVIEW_CHARS: usize = 200;

/// Steps after which a response with only thinking is closed out.
const STALL_STEP_LIMIT: u32 = 3;

const DEFAULT_MAX_STEPS: u32 = 10;
const DEFAULT_MAX_TOOL_CALLS: usize = 5;
const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(120);

/// Where the loop sends its events.
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: AgentEvent);

    /// True once nobody is listening any more.
    fn is_closed(&self) -> bool {
        false
    }
}

#[async_trait]
impl EventSink for Vec<AgentEvent> {
    async fn emit(&mut self, event: AgentEvent) {
        self.push(event);
    }
}

#[async_trait]
impl EventSink for mpsc::Sender<AgentEvent> {
    async fn emit(&mut self, event: AgentEvent) {
        let _ = self.send(event).await;
    }

    fn is_closed(&self) -> bool {
        mpsc::Sender::is_closed(self)
    }
}

/// Why a run ended without an answer from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    MaxStepsReached,
    ProviderError(String),
    ToolLimitReached,
    DuplicateToolCall,
    Timeout { secs: u64 },
    UnusableResponse,
    Exception(String),
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxStepsReached => "max_steps_reached",
            Self::ProviderError(_) => "provider_error",
            Self::ToolLimitReached => "tool_limit_reached",
            Self::DuplicateToolCall => "duplicate_tool_call",
            Self::Timeout { .. } => "timeout",
            Self::UnusableResponse => "unusable_response",
            Self::Exception(_) => "exception",
        }
    }

    /// The message the caller receives instead of an answer.
    pub fn fallback_message(&self) -> String {
        match self {
            Self::MaxStepsReached => "I've reached my maximum number of research steps. Based on what I found, \
                 I can provide you with the information I gathered so far."
                .into(),
            Self::ProviderError(e) => {
                format!("I'm sorry, I couldn't get a response from the language model to complete your request ({e}).")
            }
            Self::ToolLimitReached => "I've reached the maximum number of tool calls. Based on my research, \
                 I can provide you with the information I've gathered so far."
                .into(),
            Self::DuplicateToolCall => "I found the information but encountered a processing loop. Based on my \
                 search results, I can provide you with the available information."
                .into(),
            Self::Timeout { secs } => {
                format!("I'm sorry, the language model did not respond within {secs} seconds. Please try again.")
            }
            Self::UnusableResponse => "I encountered a formatting error in my response. Here's what I found so far \
                 based on the search results, but I may not have the complete information you requested."
                .into(),
            Self::Exception(e) => format!("I encountered an error during my research: {e}"),
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderError(detail) | Self::Exception(detail) => write!(f, "{}: {detail}", self.as_str()),
            Self::Timeout { secs } => write!(f, "timeout: no provider response after {secs}s"),
            _ => f.write_str(self.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Done,
    Aborted(AbortReason),
}

impl Termination {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Result of one agent invocation. Every termination path has this shape.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub message: String,
    pub usage: Usage,
    pub steps: u32,
    pub tool_calls: usize,
    pub termination: Termination,
    pub step_records: Vec<AgentStepRecord>,
    pub transcript: Transcript,
}

enum StepOutcome {
    Continue,
    Finish(String),
    Abort(AbortReason),
}

struct LastTool {
    name: String,
    output: String,
    step: u32,
}

/// Mutable state of one invocation.
struct RunState {
    transcript: Transcript,
    usage: Usage,
    step: u32,
    tool_calls: usize,
    signatures: HashSet<String>,
    last_tool: Option<LastTool>,
}

/// Forwards events to the caller's sink and keeps the step records.
struct Recorder<'a> {
    sink: &'a mut dyn EventSink,
    records: Vec<AgentStepRecord>,
    step: u32,
}

impl Recorder<'_> {
    async fn emit(&mut self, event: AgentEvent) {
        if let AgentEvent::StepStart { step } = &event {
            self.step = *step;
        }
        if let Some(record) = AgentStepRecord::from_event(&event, self.step) {
            self.records.push(record);
        }
        self.sink.emit(event).await;
    }

    async fn card(&mut self, card: ThoughtCard) {
        self.emit(AgentEvent::ThoughtCard(card)).await;
    }
}

/// The agent loop. Cheap to clone; everything shared is behind an `Arc`.
#[derive(Clone)]
pub struct AgentLoop {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) model: String,
    pub(crate) tools: Arc<ToolRegistry>,
    pub(crate) workspace: Arc<Workspace>,
    pub(crate) temperature: f32,
    pub(crate) max_tokens: Option<u32>,
    pub(crate) tool_timeout: Duration,
    pub(crate) max_steps: u32,
    pub(crate) max_tool_calls: usize,
    pub(crate) step_timeout: Duration,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        workspace: Arc<Workspace>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            tools,
            workspace,
            temperature: 0.7,
            max_tokens: None,
            max_steps: DEFAULT_MAX_STEPS,
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Build a loop with limits and sampling settings from `config`.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        workspace: Arc<Workspace>,
    ) -> Self {
        Self::new(provider, config.default_model.clone(), tools, workspace)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_max_steps(config.agent.max_steps)
            .with_max_tool_calls(config.agent.max_tool_calls)
            .with_step_timeout(Duration::from_secs(config.agent.step_timeout_secs))
            .with_tool_timeout(Duration::from_secs(config.agent.tool_timeout_secs))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Bound on a single provider call.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Bound on a single tool call.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run to completion and return everything at once.
    pub async fn run(&self, history: Vec<Message>) -> AgentOutcome {
        let mut events: Vec<AgentEvent> = Vec::new();
        self.drive(history, &mut events).await
    }

    /// Run in the background, streaming events as they happen.
    ///
    /// The channel closes after the `final_usage` event.
    pub fn run_stream(&self, history: Vec<Message>) -> mpsc::Receiver<AgentEvent> {
        let (mut tx, rx) = mpsc::channel::<AgentEvent>(128);
        let agent = self.clone();
        tokio::spawn(async move {
            agent.drive(history, &mut tx).await;
        });
        rx
    }

    /// The state machine shared by both modes.
    pub async fn drive(&self, history: Vec<Message>, sink: &mut dyn EventSink) -> AgentOutcome {
        let prompt = SystemPromptBuilder::new(
            self.tools.clone(),
            self.workspace.clone(),
            self.max_steps,
            self.max_tool_calls,
        )
        .build_system_prompt()
        .await;
        let executor = ToolExecutor::new(self.tools.clone()).with_timeout(self.tool_timeout);

        let mut run = RunState {
            transcript: Transcript::with_system(prompt, history),
            usage: Usage::default(),
            step: 0,
            tool_calls: 0,
            signatures: HashSet::new(),
            last_tool: None,
        };
        let mut recorder = Recorder {
            sink,
            records: Vec::new(),
            step: 0,
        };

        info!(model = %self.model, messages = run.transcript.len(), "Agent started");
        recorder
            .emit(AgentEvent::Status {
                message: "Agent started".into(),
                step: 0,
            })
            .await;

        let outcome: Result<String, AbortReason> = loop {
            if run.step >= self.max_steps {
                warn!(steps = run.step, "Max steps reached");
                break Err(AbortReason::MaxStepsReached);
            }
            if recorder.sink.is_closed() {
                info!(step = run.step, "Event consumer went away, stopping");
                break Err(AbortReason::Exception("event stream closed".into()));
            }
            run.step += 1;

            let step = AssertUnwindSafe(self.step(&mut run, &executor, &mut recorder))
                .catch_unwind()
                .await;
            match step {
                Ok(StepOutcome::Continue) => continue,
                Ok(StepOutcome::Finish(answer)) => break Ok(answer),
                Ok(StepOutcome::Abort(reason)) => break Err(reason),
                Err(panic) => {
                    let msg = panic_message(panic.as_ref());
                    warn!(step = run.step, error = %msg, "Agent step panicked");
                    break Err(AbortReason::Exception(msg));
                }
            }
        };

        let (message, termination) = match outcome {
            Ok(answer) => (answer, Termination::Done),
            Err(reason) => (reason.fallback_message(), Termination::Aborted(reason)),
        };
        self.finish(run, recorder, message, termination).await
    }

    async fn step(&self, run: &mut RunState, executor: &ToolExecutor, sink: &mut Recorder<'_>) -> StepOutcome {
        let step = run.step;
        debug!(step, "Agent loop step");
        sink.emit(AgentEvent::StepStart { step }).await;
        sink.card(ThoughtCard::new(
            CardType::Thinking,
            step,
            format!("Step {step}"),
            format!("Processing step {step}..."),
        ))
        .await;

        let mut request = ProviderRequest::new(self.model.clone(), run.transcript.messages().to_vec());
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        let response = match tokio::time::timeout(self.step_timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(step, provider = self.provider.name(), error = %e, "Provider call failed");
                return StepOutcome::Abort(AbortReason::ProviderError(e.to_string()));
            }
            Err(_) => {
                warn!(step, timeout_secs = self.step_timeout.as_secs(), "Provider call timed out");
                return StepOutcome::Abort(AbortReason::Timeout {
                    secs: self.step_timeout.as_secs(),
                });
            }
        };

        run.usage.accumulate(&response.usage);
        run.transcript.push(Message::assistant(response.content.as_str()));

        let ParsedResponse {
            thinking,
            tool_call,
            final_answer,
            ..
        } = parse_response(&response.content);

        if let Some(thought) = &thinking {
            sink.card(ThoughtCard::new(CardType::Thinking, step, "Thinking", thought.as_str()))
                .await;
        }

        if let Some(call) = tool_call {
            if run.tool_calls >= self.max_tool_calls {
                warn!(step, executed = run.tool_calls, "Tool call ceiling reached");
                return StepOutcome::Abort(AbortReason::ToolLimitReached);
            }
            if !run.signatures.insert(call.signature()) {
                warn!(step, tool = %call.name, "Duplicate tool call");
                return StepOutcome::Abort(AbortReason::DuplicateToolCall);
            }
            self.run_tool(run, executor, sink, call).await;
            return match final_answer {
                Some(answer) => StepOutcome::Finish(answer),
                None => StepOutcome::Continue,
            };
        }

        if let Some(answer) = final_answer {
            return StepOutcome::Finish(answer);
        }

        if thinking.is_some() {
            if should_force_close(run) {
                info!(step, "Closing out a response that only contains thinking");
                return StepOutcome::Finish(closing_message(run.last_tool.as_ref()));
            }
            return StepOutcome::Continue;
        }

        warn!(step, chars = response.content.len(), "Response has no usable content");
        StepOutcome::Abort(AbortReason::UnusableResponse)
    }

    async fn run_tool(&self, run: &mut RunState, executor: &ToolExecutor, sink: &mut Recorder<'_>, call: ToolCallRequest) {
        let step = run.step;
        let args = Value::Object(call.args.clone());
        let writes_file = FILE_PRODUCING_TOOLS.contains(&call.name.as_str());

        if writes_file {
            sink.card(
                ThoughtCard::new(CardType::FileWriting, step, "Writing file", target_path(&args, None))
                    .with_tool(call.name.as_str(), Some(args.clone())),
            )
            .await;
        }
        sink.card(
            ThoughtCard::new(
                CardType::ToolExecution,
                step,
                format!("Executing {}", call.name),
                format!("Running {}", call.name),
            )
            .with_tool(call.name.as_str(), Some(args.clone())),
        )
        .await;

        let output = executor.execute(&call).await;
        run.tool_calls += 1;

        sink.card(
            ThoughtCard::new(
                CardType::ToolResult,
                step,
                format!("{} result", call.name),
                preview(&output, RESULT_PREVIEW_CHARS),
            )
            .with_tool(call.name.as_str(), None)
            .with_result(output.as_str()),
        )
        .await;
        if writes_file {
            let written = serde_json::from_str::<Value>(&output).ok();
            sink.card(
                ThoughtCard::new(CardType::FileComplete, step, "File saved", target_path(&args, written.as_ref()))
                    .with_tool(call.name.as_str(), None),
            )
            .await;
        }

        run.transcript
            .push(Message::user(format!("Tool result from {}: {output}", call.name)));
        run.last_tool = Some(LastTool {
            name: call.name,
            output,
            step,
        });
    }

    async fn finish(&self, run: RunState, mut recorder: Recorder<'_>, message: String, termination: Termination) -> AgentOutcome {
        if let Termination::Aborted(reason) = &termination {
            if *reason != AbortReason::MaxStepsReached {
                recorder
                    .emit(AgentEvent::Error {
                        message: reason.to_string(),
                    })
                    .await;
            }
        }
        recorder
            .card(ThoughtCard::new(CardType::FinalAnswer, run.step, "Final Answer", message.as_str()))
            .await;
        recorder
            .emit(AgentEvent::FinalMessage {
                content: message.clone(),
            })
            .await;
        recorder
            .emit(AgentEvent::FinalUsage {
                usage: run.usage,
                agent_steps: run.step,
            })
            .await;

        info!(
            steps = run.step,
            tool_calls = run.tool_calls,
            tokens_in = run.usage.tokens_in,
            tokens_out = run.usage.tokens_out,
            outcome = match &termination {
                Termination::Done => "done",
                Termination::Aborted(reason) => reason.as_str(),
            },
            "Agent finished"
        );

        AgentOutcome {
            message,
            usage: run.usage,
            steps: run.step,
            tool_calls: run.tool_calls,
            termination,
            step_records: recorder.records,
            transcript: run.transcript,
        }
    }
}

/// A thinking-only response ends the run past the stall limit, or right
/// after an email was produced.
fn should_force_close(run: &RunState) -> bool {
    if run.step > STALL_STEP_LIMIT {
        return true;
    }
    run.last_tool.as_ref().is_some_and(|last| {
        last.step + 1 == run.step
            && (last.name == "email_write"
                || (last.name == "file_write" && last.output.to_lowercase().contains("email")))
    })
}

fn closing_message(last: Option<&LastTool>) -> String {
    match last {
        Some(last) if last.output.contains("\"status\": \"sent\"") => {
            "Task completed successfully. The email has been sent as requested.".into()
        }
        Some(last) if last.name == "email_write" || last.output.to_lowercase().contains("email") => {
            "I've created the email draft as requested. You can find it with the other email drafts in the workspace."
                .into()
        }
        Some(last) => format!(
            "Based on my research and actions, I have completed the requested task. {}",
            last.output
        ),
        None => "I have completed the requested task based on the available information.".into(),
    }
}

/// File a file-producing tool is working on, preferring what it reported.
fn target_path(args: &Value, output: Option<&Value>) -> String {
    let reported = output.and_then(|o| o.get("path").or_else(|| o.get("filepath")));
    reported
        .or_else(|| args.get("path"))
        .or_else(|| args.get("output_path"))
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .unwrap_or("generated file")
        .to_string()
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
