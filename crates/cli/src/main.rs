//! scout CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  Write the default config and create the workspace
//! - `agent`    One message or an interactive session
//! - `gateway`  Start the HTTP gateway
//! - `status`   Show what is configured

use clap::{Parser, Subcommand};
use scout_agent::ChatMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "scout",
    about = "scout: research, case studies and outreach from one agent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write ~/.scout/config.toml and create the workspace directories
    Onboard {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Chat with the agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Print intermediate steps as they happen
        #[arg(long)]
        stream: bool,

        /// auto, chat or agent
        #[arg(long, default_value = "auto")]
        mode: ChatMode,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the bind address
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show configuration and workspace status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Onboard { force } => commands::onboard::run(force).await?,
        Commands::Agent {
            message,
            stream,
            mode,
        } => commands::agent::run(message, stream, mode).await?,
        Commands::Gateway { host, port } => commands::gateway::run(host, port).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
