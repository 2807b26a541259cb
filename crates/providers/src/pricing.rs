//! Built-in pricing table for the models scout talks to.
//!
//! Prices are in USD per 1 million tokens. Providers use the table to turn
//! the token counts of each completion into `cost_usd`; config can add or
//! override entries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
}

impl ModelPricing {
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Compute cost for the given token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_per_m + output_tokens as f64 * self.output_per_m)
            / 1_000_000.0
    }
}

/// Thread-safe pricing table with built-in defaults and custom overrides.
pub struct PricingTable {
    prices: RwLock<HashMap<String, ModelPricing>>,
}

const PROVIDER_PREFIXES: &[&str] = &["openai", "anthropic", "google", "mistral", "deepseek", "meta-llama"];

impl PricingTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let defaults: &[(&str, f64, f64)] = &[
            // ── OpenAI ─────────────────────────────────────────────────
            ("openai/gpt-4o", 2.5, 10.0),
            ("openai/gpt-4o-mini", 0.15, 0.6),
            ("openai/gpt-4.1", 2.0, 8.0),
            ("openai/gpt-4.1-mini", 0.4, 1.6),
            ("openai/gpt-4-turbo", 10.0, 30.0),
            ("openai/o3-mini", 1.1, 4.4),
            // ── Anthropic ──────────────────────────────────────────────
            ("anthropic/claude-3-haiku", 0.25, 1.25),
            ("anthropic/claude-3-5-haiku", 0.8, 4.0),
            ("anthropic/claude-3-sonnet", 3.0, 15.0),
            ("anthropic/claude-3-5-sonnet", 3.0, 15.0),
            ("anthropic/claude-sonnet-4", 3.0, 15.0),
            // ── Others reachable through OpenAI-compatible endpoints ──
            ("google/gemini-2.0-flash", 0.1, 0.4),
            ("mistral/mistral-small", 0.2, 0.6),
            ("deepseek/deepseek-chat", 0.27, 1.1),
            ("meta-llama/llama-3.1-70b", 0.52, 0.75),
        ];

        let prices = defaults
            .iter()
            .map(|(name, input, output)| (name.to_string(), ModelPricing::new(*input, *output)))
            .collect();

        Self {
            prices: RwLock::new(prices),
        }
    }

    /// Create an empty pricing table.
    pub fn empty() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ModelPricing>> {
        self.prices.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up pricing for a model. Returns None if not found.
    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        self.read().get(model).copied()
    }

    /// Add or update pricing for a model.
    pub fn set(&self, model: impl Into<String>, pricing: ModelPricing) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.insert(model.into(), pricing);
    }

    /// Compute cost for a model call, returning 0.0 if model is not in table.
    ///
    /// Tries an exact match, then common provider prefixes
    /// (`gpt-4o` finds `openai/gpt-4o`), then the longest key whose bare name
    /// prefixes the model (`gpt-4o-mini-2024-07-18` finds `gpt-4o-mini`).
    pub fn compute_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let prices = self.read();

        if let Some(p) = prices.get(model) {
            return p.cost(input_tokens, output_tokens);
        }

        for prefix in PROVIDER_PREFIXES {
            if let Some(p) = prices.get(&format!("{prefix}/{model}")) {
                return p.cost(input_tokens, output_tokens);
            }
        }

        let model_lower = model.to_lowercase();
        let bare_model = model_lower.rsplit('/').next().unwrap_or(&model_lower);

        let best = prices
            .iter()
            .filter_map(|(key, pricing)| {
                let bare_key = key.rsplit('/').next().unwrap_or(key).to_lowercase();
                bare_model.starts_with(&bare_key).then_some((bare_key.len(), pricing))
            })
            .max_by_key(|(len, _)| *len);

        match best {
            Some((_, p)) => p.cost(input_tokens, output_tokens),
            None => 0.0,
        }
    }

    /// List all known model names, sorted.
    pub fn models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
