//! `scout gateway`: start the HTTP API server.

use anyhow::Context;
use scout_config::AppConfig;

pub async fn run(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("Failed to load config")?;

    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    println!("scout gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Workspace: {}", config.workspace.data_root.display());
    println!("   Provider:  {} ({})", config.default_provider, config.default_model);

    scout_gateway::start(config).await.map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
