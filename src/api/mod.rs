//! HTTP API server for the voice chat front-end

pub mod chat;
pub mod health;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::Html;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, DEFAULT_MAX_AUDIO_BYTES, DEFAULT_PORT, ServerConfig};
use crate::gateway::Gateways;
use crate::persona::Persona;
use crate::presentation::INDEX_HTML;
use crate::session::SessionRegistry;
use crate::Result;

/// Headroom for JSON framing and base64 inflation over the raw audio limit
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Shared state for API handlers
pub struct ApiState {
    pub sessions: SessionRegistry,
    pub llm_model: String,
    pub tts_voice: String,
    pub max_audio_bytes: usize,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    gateways: Gateways,
    persona: Arc<Persona>,
    bind: String,
    port: u16,
    max_audio_bytes: usize,
    session_idle: Option<Duration>,
    llm_model: String,
    tts_voice: String,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(gateways: Gateways, persona: Arc<Persona>) -> Self {
        let server = ServerConfig::default();
        Self {
            gateways,
            persona,
            bind: server.bind,
            port: DEFAULT_PORT,
            max_audio_bytes: DEFAULT_MAX_AUDIO_BYTES,
            session_idle: server.session_idle,
            llm_model: String::new(),
            tts_voice: String::new(),
        }
    }

    /// Take listen address, limits and reported model/voice from configuration
    #[must_use]
    pub fn config(mut self, config: &Config) -> Self {
        self.bind.clone_from(&config.server.bind);
        self.port = config.server.port;
        self.max_audio_bytes = config.server.max_audio_bytes;
        self.session_idle = config.server.session_idle;
        self.llm_model.clone_from(&config.llm.model);
        self.tts_voice.clone_from(&config.speech.voice);
        self
    }

    #[must_use]
    pub const fn max_audio_bytes(mut self, bytes: usize) -> Self {
        self.max_audio_bytes = bytes;
        self
    }

    /// Discard sessions idle for longer than `limit` (`None` = never)
    #[must_use]
    pub const fn session_idle(mut self, limit: Option<Duration>) -> Self {
        self.session_idle = limit;
        self
    }

    #[must_use]
    pub fn llm_model(mut self, model: String) -> Self {
        self.llm_model = model;
        self
    }

    #[must_use]
    pub fn tts_voice(mut self, voice: String) -> Self {
        self.tts_voice = voice;
        self
    }

    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            sessions: SessionRegistry::new(self.gateways, self.persona)
                .with_idle_limit(self.session_idle),
            llm_model: self.llm_model,
            tts_voice: self.tts_voice,
            max_audio_bytes: self.max_audio_bytes,
        });

        ApiServer {
            state,
            bind: self.bind,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    bind: String,
    port: u16,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let body_limit = self.state.max_audio_bytes.saturating_mul(4) / 3 + BODY_LIMIT_SLACK;

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", get(index))
            .nest("/api/sessions", chat::router(Arc::clone(&self.state)))
            .merge(health::router())
            .merge(health::status_router(Arc::clone(&self.state)))
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind((self.bind.as_str(), self.port))
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            bind = %self.bind,
            port = self.port,
            persona = self.state.sessions.persona().name(),
            "API server listening"
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
