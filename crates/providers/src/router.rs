//! Provider router: selects the completion provider by name.
//!
//! Chat requests may name a provider ("openai", "anthropic", ...); anything
//! unknown falls back to the configured default.

use std::collections::HashMap;
use std::sync::Arc;
use scout_core::provider::Provider;
use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::pricing::{ModelPricing, PricingTable};

/// Routes completion requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn default_name(&self) -> &str {
        &self.default_provider
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The named provider, or the default when the name is absent or unknown.
    pub fn resolve(&self, name: Option<&str>) -> Option<Arc<dyn Provider>> {
        name.and_then(|n| self.get(n))
            .or_else(|| self.default_provider())
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

/// Build providers from configuration.
///
/// Every `[providers.<name>]` section becomes a provider; the default
/// provider is always registered, even without its own section.
pub fn build_from_config(config: &scout_config::AppConfig) -> ProviderRouter {
    let pricing = Arc::new(PricingTable::with_defaults());
    for (model, over) in &config.pricing {
        pricing.set(model.clone(), ModelPricing::new(over.input_per_m, over.output_per_m));
    }

    let mut router = ProviderRouter::new(&config.default_provider);

    let mut names: Vec<&str> = config.providers.keys().map(|s| s.as_str()).collect();
    if !names.contains(&config.default_provider.as_str()) {
        names.push(&config.default_provider);
    }

    for name in names {
        let api_key = config.provider_api_key(name).unwrap_or_default();
        let api_url = config.providers.get(name).and_then(|p| p.api_url.clone());

        let provider: Arc<dyn Provider> = if name == "anthropic" {
            let mut p = AnthropicProvider::new(&api_key).with_pricing(pricing.clone());
            if let Some(url) = api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        } else {
            let base_url = api_url.unwrap_or_else(|| default_base_url(name));
            Arc::new(OpenAiCompatProvider::new(name, base_url, &api_key).with_pricing(pricing.clone()))
        };

        router.register(name, provider);
    }

    router
}

/// Get the default base URL for well-known OpenAI-compatible providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "anthropic" => "https://api.anthropic.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "mistral" => "https://api.mistral.ai/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_config::{AppConfig, ProviderConfig};

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openai");
        router.register("openai", Arc::new(OpenAiCompatProvider::openai("sk-test")));

        assert!(router.get("openai").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default_provider().is_some());
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let mut router = ProviderRouter::new("openai");
        router.register("openai", Arc::new(OpenAiCompatProvider::openai("sk-test")));
        router.register("anthropic", Arc::new(AnthropicProvider::new("k")));

        assert_eq!(router.resolve(Some("anthropic")).unwrap().name(), "anthropic");
        assert_eq!(router.resolve(Some("bogus")).unwrap().name(), "openai");
        assert_eq!(router.resolve(None).unwrap().name(), "openai");
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config() {
        let router = build_from_config(&AppConfig::default());
        assert_eq!(router.list(), vec!["openai"]);
        assert!(router.default_provider().is_some());
    }

    #[test]
    fn build_registers_configured_sections() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "anthropic".into(),
            ProviderConfig {
                api_key: Some("ant".into()),
                api_url: None,
                default_model: None,
            },
        );
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["anthropic", "openai"]);
        assert_eq!(router.get("anthropic").unwrap().name(), "anthropic");
    }
}
