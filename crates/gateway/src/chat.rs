//! `/chat` and `/chat/stream`.

use crate::SharedState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        Json,
        sse::{Event as SseEvent, Sse},
    },
};
use scout_agent::{AbortReason, AgentEvent, AgentLoop, AgentStepRecord, ChatMode, Termination};
use scout_core::message::{Message, Role};
use scout_core::provider::Usage;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub agent_mode: ChatMode,
}

#[derive(Debug, Serialize)]
pub struct ReplyMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub ok: bool,
    pub message: ReplyMessage,
    pub usage: Usage,
    pub agent_steps: u32,
    pub step_records: Vec<AgentStepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    fn reply(content: String, usage: Usage) -> Self {
        Self {
            ok: true,
            message: ReplyMessage {
                role: Role::Assistant,
                content,
            },
            usage,
            agent_steps: 0,
            step_records: Vec::new(),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            ok: false,
            error: Some(error.clone()),
            ..Self::reply(error, Usage::default())
        }
    }
}

type ChatError = (StatusCode, Json<ChatResponse>);

/// Validate the request and build the agent it runs on.
fn prepare(state: &SharedState, payload: &ChatRequest) -> Result<(AgentLoop, ChatMode), ChatError> {
    let Some(last_user) = payload
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
    else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ChatResponse::failure("messages must contain at least one user message")),
        ));
    };

    let provider_name = state.provider_name(payload.provider.as_deref());
    let Some(provider) = state.providers.get(provider_name) else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ChatResponse::failure(format!("Provider '{provider_name}' is not configured"))),
        ));
    };
    let model = state.model_for(provider_name, payload.model.as_deref());
    let mode = payload.agent_mode.resolve(last_user);

    info!(
        provider = provider_name,
        model = %model,
        mode = %mode,
        messages = payload.messages.len(),
        "Chat request"
    );

    let agent = AgentLoop::from_config(&state.config, provider, state.tools.clone(), state.workspace.clone())
        .with_model(model);
    Ok((agent, mode))
}

/// `POST /chat`: run to completion and return one JSON document.
pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ChatError> {
    let (agent, mode) = prepare(&state, &payload)?;

    if mode != ChatMode::Agent {
        let outcome = agent.run_single_turn(payload.messages).await;
        return Ok(Json(ChatResponse::reply(outcome.message, outcome.usage)));
    }

    let outcome = agent.run(payload.messages).await;
    let (ok, error) = match &outcome.termination {
        Termination::Done => (true, None),
        Termination::Aborted(reason) => {
            let hard_failure = matches!(
                reason,
                AbortReason::ProviderError(_) | AbortReason::Timeout { .. } | AbortReason::Exception(_)
            );
            (!hard_failure, Some(reason.to_string()))
        }
    };

    Ok(Json(ChatResponse {
        ok,
        message: ReplyMessage {
            role: Role::Assistant,
            content: outcome.message,
        },
        usage: outcome.usage,
        agent_steps: outcome.steps,
        step_records: outcome.step_records,
        error,
    }))
}

/// `POST /chat/stream`: server-sent `data: <json>` frames.
///
/// Chat mode produces a single `final_message` and `final_usage` pair.
pub async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ChatError> {
    let (agent, mode) = prepare(&state, &payload)?;

    let rx = if mode == ChatMode::Agent {
        agent.run_stream(payload.messages)
    } else {
        let (tx, rx) = mpsc::channel::<AgentEvent>(4);
        let messages = payload.messages;
        tokio::spawn(async move {
            let outcome = agent.run_single_turn(messages).await;
            let _ = tx
                .send(AgentEvent::FinalMessage {
                    content: outcome.message,
                })
                .await;
            let _ = tx
                .send(AgentEvent::FinalUsage {
                    usage: outcome.usage,
                    agent_steps: 0,
                })
                .await;
        });
        rx
    };

    let stream = ReceiverStream::new(rx).map(|event| Ok(SseEvent::default().data(event.to_json())));
    Ok(Sse::new(stream))
}
