//! `scout agent`: single-message or interactive mode.

use anyhow::Context;
use scout_agent::{AgentEvent, AgentLoop, ChatMode, Termination};
use scout_config::AppConfig;
use scout_core::message::Message;
use scout_core::provider::Usage;
use scout_tools::Workspace;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>, stream: bool, mode: ChatMode) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured for '{}'", config.default_provider);
        eprintln!();
        eprintln!("  Set SCOUT_API_KEY (or OPENAI_API_KEY), or add api_key to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let workspace = Arc::new(Workspace::open(&config.workspace.data_root).context("Failed to open workspace")?);
    let tools = Arc::new(scout_tools::build_registry(&config, workspace.clone()));
    let router = scout_providers::build_from_config(&config);
    let provider = router
        .default_provider()
        .context("No default provider configured")?;
    let agent = AgentLoop::from_config(&config, provider, tools.clone(), workspace.clone());

    if let Some(msg) = message {
        let reply = respond(&agent, vec![Message::user(msg)], mode, stream).await;
        println!("{reply}");
        return Ok(());
    }

    println!();
    println!("  scout: interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", agent.model());
    println!("  Mode:      {mode}");
    println!("  Tools:     {}", tools.names().join(", "));
    println!("  Workspace: {}", workspace.root().display());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        if line.is_empty() {
            prompt()?;
            continue;
        }

        history.push(Message::user(line));
        let reply = respond(&agent, history.clone(), mode, stream).await;
        println!();
        for l in reply.lines() {
            println!("  scout > {l}");
        }
        println!();
        history.push(Message::assistant(reply));

        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// Route one turn by mode and return the reply text.
async fn respond(agent: &AgentLoop, history: Vec<Message>, mode: ChatMode, stream: bool) -> String {
    let latest = history.last().map(|m| m.content.clone()).unwrap_or_default();

    match mode.resolve(&latest) {
        ChatMode::Agent if stream => stream_steps(agent, history).await,
        ChatMode::Agent => {
            eprint!("  Working...");
            let outcome = agent.run(history).await;
            eprint!("\r            \r");
            if let Termination::Aborted(reason) = &outcome.termination {
                eprintln!("  [stopped: {reason}]");
            }
            print_usage(&outcome.usage, outcome.steps);
            outcome.message
        }
        _ => {
            let outcome = agent.run_single_turn(history).await;
            print_usage(&outcome.usage, 0);
            outcome.message
        }
    }
}

/// Print thought cards to stderr as they arrive; return the final message.
async fn stream_steps(agent: &AgentLoop, history: Vec<Message>) -> String {
    let mut rx = agent.run_stream(history);
    let mut reply = String::new();

    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::Status { message, .. } => eprintln!("  .. {message}"),
            AgentEvent::StepStart { .. } => {}
            AgentEvent::ThoughtCard(card) => {
                eprintln!("  [{}] {}", card.step, card.title);
                if let Some(name) = &card.tool_name {
                    eprintln!("       tool: {name}");
                }
            }
            AgentEvent::Error { message } => eprintln!("  [error] {message}"),
            AgentEvent::FinalMessage { content } => reply = content,
            AgentEvent::FinalUsage { usage, agent_steps } => print_usage(&usage, agent_steps),
        }
    }

    reply
}

fn print_usage(usage: &Usage, steps: u32) {
    eprintln!(
        "  ({} steps, {} in / {} out tokens, ${:.4})",
        steps, usage.tokens_in, usage.tokens_out, usage.cost_usd
    );
}
