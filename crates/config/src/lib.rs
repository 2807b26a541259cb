//! Configuration loading, validation, and management for scout.
//!
//! Loads configuration from `~/.scout/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.scout/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the default provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default completion provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Agent loop bounds
    #[serde(default)]
    pub agent: AgentConfig,

    /// Sandboxed file workspace
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Web search backend
    #[serde(default)]
    pub search: SearchConfig,

    /// Outbound email
    #[serde(default)]
    pub email: EmailConfig,

    /// Browser automation service
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Per-model pricing overrides
    #[serde(default)]
    pub pricing: HashMap<String, PricingOverrideConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("workspace", &self.workspace)
            .field("gateway", &self.gateway)
            .field("search", &self.search)
            .field("email", &self.email)
            .field("browser", &self.browser)
            .field("providers", &self.providers)
            .field("pricing", &self.pricing)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard bound on loop iterations per request
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Hard bound on tool executions per request
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,

    /// Wall-clock bound on a single provider call
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,

    /// Wall-clock bound on a single tool invocation
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

fn default_max_steps() -> u32 {
    10
}
fn default_max_tool_calls() -> usize {
    5
}
fn default_step_timeout() -> u64 {
    120
}
fn default_tool_timeout() -> u64 {
    600
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_tool_calls: default_max_tool_calls(),
            step_timeout_secs: default_step_timeout(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory every file tool is confined to
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Origins allowed by CORS; empty means any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Brave Search subscription token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brave_api_key: Option<String>,

    #[serde(default = "default_results_per_query")]
    pub results_per_query: u32,
}

fn default_results_per_query() -> u32 {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            brave_api_key: None,
            results_per_query: default_results_per_query(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("brave_api_key", &redact(&self.brave_api_key))
            .field("results_per_query", &self.results_per_query)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sendgrid_api_key: Option<String>,

    /// Sender address used for outbound mail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("sendgrid_api_key", &redact(&self.sendgrid_api_key))
            .field("from_address", &self.from_address)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Base URL of the browser automation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,
}

fn default_browser_timeout() -> u64 {
    600
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_browser_timeout(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Custom per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    /// Price per 1M input tokens in USD
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD
    pub output_per_m: f64,
}

impl AppConfig {
    /// Load configuration from the default path (~/.scout/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// API keys from the environment only fill gaps; everything else replaces
    /// the file value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("SCOUT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("SCOUT_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("SCOUT_MODEL") {
            self.default_model = model;
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            let entry = self
                .providers
                .entry("anthropic".into())
                .or_insert_with(|| ProviderConfig {
                    api_key: None,
                    api_url: None,
                    default_model: None,
                });
            if entry.api_key.is_none() {
                entry.api_key = Some(key);
            }
        }
        match lookup("AGENT_MAX_STEPS").map(|v| v.parse::<u32>()) {
            Some(Ok(steps)) => self.agent.max_steps = steps,
            Some(Err(e)) => tracing::warn!("Ignoring AGENT_MAX_STEPS: {e}"),
            None => {}
        }
        if let Some(root) = lookup("DATA_ROOT") {
            self.workspace.data_root = PathBuf::from(root);
        }
        if self.search.brave_api_key.is_none() {
            self.search.brave_api_key = lookup("BRAVE_API_KEY");
        }
        if self.email.sendgrid_api_key.is_none() {
            self.email.sendgrid_api_key = lookup("SENDGRID_API_KEY");
        }
        if self.email.from_address.is_none() {
            self.email.from_address = lookup("SENDGRID_FROM_EMAIL");
        }
        if let Some(endpoint) = lookup("BROWSER_AUTOMATION_URL") {
            self.browser.endpoint = Some(endpoint);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".scout")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.agent.max_tool_calls == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_calls must be at least 1".into(),
            ));
        }

        if self.workspace.data_root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "workspace.data_root must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// API key for a provider: its own section first, then the top-level key
    /// when it is the default provider.
    pub fn provider_api_key(&self, name: &str) -> Option<String> {
        self.providers
            .get(name)
            .and_then(|p| p.api_key.clone())
            .or_else(|| {
                if name == self.default_provider {
                    self.api_key.clone()
                } else {
                    None
                }
            })
    }

    /// Check if an API key is available for the default provider.
    pub fn has_api_key(&self) -> bool {
        self.provider_api_key(&self.default_provider).is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            workspace: WorkspaceConfig::default(),
            gateway: GatewayConfig::default(),
            search: SearchConfig::default(),
            email: EmailConfig::default(),
            browser: BrowserConfig::default(),
            providers: HashMap::new(),
            pricing: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.agent.max_tool_calls, 5);
        assert_eq!(config.workspace.data_root, PathBuf::from("./data"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.agent.tool_timeout_secs, config.agent.tool_timeout_secs);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml_str = r#"
            default_model = "claude-3-5-haiku-20241022"
            default_provider = "anthropic"

            [agent]
            max_steps = 6

            [pricing."my-model"]
            input_per_m = 1.0
            output_per_m = 2.0
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_provider, "anthropic");
        assert_eq!(config.agent.max_steps, 6);
        assert_eq!(config.agent.max_tool_calls, 5);
        assert_eq!(config.pricing["my-model"].output_per_m, 2.0);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_step_budget_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.max_tool_calls = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_provider = [").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env(env_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("ANTHROPIC_API_KEY", "ant-test"),
            ("AGENT_MAX_STEPS", "4"),
            ("DATA_ROOT", "/srv/scout"),
            ("BRAVE_API_KEY", "brave"),
            ("SCOUT_MODEL", "gpt-4o"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.provider_api_key("anthropic").as_deref(), Some("ant-test"));
        assert_eq!(config.agent.max_steps, 4);
        assert_eq!(config.workspace.data_root, PathBuf::from("/srv/scout"));
        assert_eq!(config.search.brave_api_key.as_deref(), Some("brave"));
        assert_eq!(config.default_model, "gpt-4o");
    }

    #[test]
    fn env_does_not_replace_file_keys() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(env_from(&[("OPENAI_API_KEY", "from-env"), ("AGENT_MAX_STEPS", "lots")]));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.agent.max_steps, 10);
    }

    #[test]
    fn top_level_key_only_serves_default_provider() {
        let config = AppConfig {
            api_key: Some("sk".into()),
            ..AppConfig::default()
        };
        assert!(config.has_api_key());
        assert_eq!(config.provider_api_key("openai").as_deref(), Some("sk"));
        assert!(config.provider_api_key("anthropic").is_none());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig {
            api_key: Some("sk-very-secret".into()),
            ..AppConfig::default()
        };
        config.search.brave_api_key = Some("brave-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("brave-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("max_steps = 10"));
    }
}
