//! Completion provider implementations for scout.
//!
//! All providers implement the `scout_core::Provider` trait and report
//! priced usage. The router selects the correct provider by name.

pub mod anthropic;
pub mod openai_compat;
pub mod pricing;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use pricing::{ModelPricing, PricingTable};
pub use router::{build_from_config, ProviderRouter};

use scout_core::ProviderError;
use std::time::Duration;

/// Shared HTTP client construction; falls back to a default client if the
/// TLS backend cannot be configured with a timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {e}");
            reqwest::Client::new()
        })
}

/// Map a non-200 HTTP status to a provider error.
pub(crate) fn status_error(status: u16, body: String, model: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        404 => ProviderError::ModelNotFound(model.to_string()),
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(status_error(401, String::new(), "m"), ProviderError::AuthenticationFailed(_)));
        assert!(matches!(status_error(404, String::new(), "m"), ProviderError::ModelNotFound(m) if m == "m"));
        assert!(matches!(status_error(429, String::new(), "m"), ProviderError::RateLimited { .. }));
        assert!(matches!(
            status_error(500, "boom".into(), "m"),
            ProviderError::ApiError { status_code: 500, .. }
        ));
    }
}
