//! HTTP gateway for scout.
//!
//! Exposes health and tool discovery, buffered and streaming chat, and the
//! sandboxed workspace under `/fs`. Built on Axum.

pub mod chat;
pub mod fs;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{delete, get, post},
};
use scout_config::AppConfig;
use scout_core::provider::ToolDefinition;
use scout_core::tool::ToolRegistry;
use scout_providers::ProviderRouter;
use scout_tools::Workspace;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Request bodies above this size are rejected.
const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Process-lifetime collaborators shared by every request.
pub struct GatewayState {
    pub config: AppConfig,
    pub providers: ProviderRouter,
    pub tools: Arc<ToolRegistry>,
    pub workspace: Arc<Workspace>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Build everything from configuration once at startup.
    pub fn from_config(config: AppConfig) -> Result<Self, scout_tools::FsError> {
        let workspace = Arc::new(Workspace::open(&config.workspace.data_root)?);
        let tools = Arc::new(scout_tools::build_registry(&config, workspace.clone()));
        let providers = scout_providers::build_from_config(&config);
        Ok(Self {
            config,
            providers,
            tools,
            workspace,
        })
    }

    /// Provider name a request ends up on.
    pub(crate) fn provider_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(name) if self.providers.get(name).is_some() => name,
            _ => self.providers.default_name(),
        }
    }

    /// Model for a request: explicit, then the provider's own default, then
    /// the global default.
    pub(crate) fn model_for(&self, provider: &str, requested: Option<&str>) -> String {
        requested
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.config
                    .providers
                    .get(provider)
                    .and_then(|p| p.default_model.clone())
            })
            .unwrap_or_else(|| self.config.default_model.clone())
    }
}

/// Build the router with every route and layer.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway.cors_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/tools", get(tools_handler))
        .route("/chat", post(chat::chat_handler))
        .route("/chat/stream", post(chat::chat_stream_handler))
        .route("/fs/list", get(fs::list_handler))
        .route("/fs/read", get(fs::read_handler))
        .route("/fs/write", post(fs::write_handler))
        .route("/fs/edit", post(fs::edit_handler))
        .route("/fs/search", get(fs::search_handler))
        .route("/fs/info", get(fs::info_handler))
        .route("/fs/delete", delete(fs::delete_handler))
        .route("/fs/mkdir", post(fs::mkdir_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server and serve until the process stops.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(config)?);

    info!(
        addr = %addr,
        provider = state.providers.default_name(),
        tools = state.tools.len(),
        workspace = %state.workspace.root().display(),
        "Gateway starting"
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    provider: String,
    model: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let provider = state.providers.default_name().to_string();
    let model = state.model_for(&provider, None);
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider,
        model,
    })
}

async fn tools_handler(State(state): State<SharedState>) -> Json<Vec<ToolDefinition>> {
    Json(state.tools.definitions())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use scout_core::error::ProviderError;
    use scout_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Replies with scripted text, repeating the last entry.
    pub(crate) struct ScriptedProvider {
        replies: Vec<String>,
        calls: Mutex<usize>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(replies: &[&str]) -> Self {
            Self {
                replies: replies.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let mut calls = self.calls.lock().unwrap();
            let reply = self.replies[(*calls).min(self.replies.len() - 1)].clone();
            *calls += 1;
            Ok(ProviderResponse {
                content: reply,
                usage: Usage::new(10, 5, 0.001),
                model: "scripted-model".into(),
            })
        }
    }

    pub(crate) fn test_state(dir: &TempDir, replies: &[&str]) -> SharedState {
        let mut config = AppConfig::default();
        config.default_provider = "scripted".into();
        config.workspace.data_root = dir.path().to_path_buf();
        let workspace = Arc::new(Workspace::open(dir.path()).unwrap());
        let tools = Arc::new(scout_tools::build_registry(&config, workspace.clone()));
        let mut providers = ProviderRouter::new("scripted");
        providers.register("scripted", Arc::new(ScriptedProvider::new(replies)));
        Arc::new(GatewayState {
            config,
            providers,
            tools,
            workspace,
        })
    }

    pub(crate) async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = build_router(test_state(&dir, &["unused"]));

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["provider"], "scripted");
        assert_eq!(json["model"], AppConfig::default().default_model);
    }

    #[tokio::test]
    async fn tools_endpoint_lists_registry() {
        let dir = TempDir::new().unwrap();
        let app = build_router(test_state(&dir, &["unused"]));

        let req = Request::builder().uri("/tools").body(Body::empty()).unwrap();
        let json = body_json(app.oneshot(req).await.unwrap()).await;

        let names: Vec<&str> = json.as_array().unwrap().iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "web_search");
        assert!(names.contains(&"browser_automate"));
    }

    #[tokio::test]
    async fn unknown_provider_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, &["unused"]);
        assert_eq!(state.provider_name(Some("nonexistent")), "scripted");
        assert_eq!(state.provider_name(None), "scripted");
        assert_eq!(state.model_for("scripted", Some("gpt-x")), "gpt-x");
        assert_eq!(state.model_for("scripted", Some("")), state.config.default_model);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let dir = TempDir::new().unwrap();
        let app = build_router(test_state(&dir, &["unused"]));

        let req = Request::builder()
            .method("OPTIONS")
            .uri("/chat")
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }
}
