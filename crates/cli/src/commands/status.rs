//! `scout status`: show what is configured.

use anyhow::Context;
use scout_config::AppConfig;
use scout_core::provider::Provider;
use scout_tools::Workspace;
use std::sync::Arc;
use std::time::Duration;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    println!("scout status");
    println!("============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    let reachable = match scout_providers::build_from_config(&config).default_provider() {
        Some(_) if !config.has_api_key() => "skipped (no API key)".to_string(),
        Some(provider) => reachability(provider.as_ref()).await,
        None => "not configured".to_string(),
    };
    println!("  Reachable:    {reachable}");
    println!("  Temperature:  {}", config.default_temperature);
    println!(
        "  Limits:       {} steps, {} tool calls",
        config.agent.max_steps, config.agent.max_tool_calls
    );
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!("  Web search:   {}", configured(config.search.brave_api_key.is_some()));
    println!("  Email:        {}", configured(config.email.sendgrid_api_key.is_some()));
    println!("  Browser:      {}", configured(config.browser.endpoint.is_some()));

    let workspace = Arc::new(Workspace::open(&config.workspace.data_root).context("Failed to open workspace")?);
    println!("  Workspace:    {}", workspace.root().display());

    let registry = scout_tools::build_registry(&config, workspace.clone());
    println!("  Tools ({}):", registry.len());
    for name in registry.names() {
        println!("    - {name}");
    }

    match workspace.list_files("output", false).await {
        Ok(listing) => println!(
            "  Output:       {} files, {} directories",
            listing.total_files, listing.total_directories
        ),
        Err(e) => println!("  Output:       unavailable ({e})"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, run `scout onboard` first");
    }

    Ok(())
}

fn configured(yes: bool) -> &'static str {
    if yes { "configured" } else { "not configured" }
}

/// One-word health of a provider, bounded so `status` never hangs.
async fn reachability(provider: &dyn Provider) -> String {
    match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, provider.health_check()).await {
        Ok(Ok(true)) => "yes".to_string(),
        Ok(Ok(false)) => "no".to_string(),
        Ok(Err(e)) => format!("error: {e}"),
        Err(_) => format!("no response within {}s", HEALTH_CHECK_TIMEOUT.as_secs()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::error::ProviderError;
    use scout_core::provider::{ProviderRequest, ProviderResponse};

    struct Health(Result<bool, ProviderError>);

    #[async_trait::async_trait]
    impl Provider for Health {
        fn name(&self) -> &str {
            "health"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("unused".into()))
        }

        async fn health_check(&self) -> Result<bool, ProviderError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn reports_provider_health() {
        assert_eq!(reachability(&Health(Ok(true))).await, "yes");
        assert_eq!(reachability(&Health(Ok(false))).await, "no");
        let down = Health(Err(ProviderError::Network("connection refused".into())));
        assert_eq!(reachability(&down).await, "error: Network error: connection refused");
    }
}
