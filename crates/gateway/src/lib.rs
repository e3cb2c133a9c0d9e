//! HTTP gateway for Switchboard.
//!
//! Routes:
//! - `GET /health`: liveness check
//! - `GET /sessions`: ids of the sessions held by live connections
//! - `GET /ws`: WebSocket carrying the workflow conversation

pub mod ws;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use switchboard_config::AppConfig;
use switchboard_core::store::{InMemorySessionStore, SessionStore};
use switchboard_workflow::WorkflowEngine;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Shared state for the gateway.
pub struct GatewayState {
    pub engine: Arc<WorkflowEngine>,
    pub store: Arc<dyn SessionStore>,
    pub cors_origin: String,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// State backed by a fresh in-memory session store.
    pub fn new(engine: Arc<WorkflowEngine>, config: &AppConfig) -> Self {
        let store = Arc::new(InMemorySessionStore::new(engine.entry()));
        Self::with_store(engine, store, config)
    }

    pub fn with_store(
        engine: Arc<WorkflowEngine>,
        store: Arc<dyn SessionStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            engine,
            store,
            cors_origin: config.gateway.cors_origin.clone(),
        }
    }
}

/// Build the router with CORS and HTTP trace logging.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.cors_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route("/sessions", get(sessions_handler))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!(origin = %origin, "Invalid CORS origin, cross-origin requests will be refused");
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway and serve until the listener fails.
pub async fn start(
    config: AppConfig,
    engine: Arc<WorkflowEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::new(engine, &config));
    let app = build_router(state);

    info!(addr = %addr, model = %config.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct SessionsResponse {
    count: usize,
    sessions: Vec<String>,
}

async fn sessions_handler(State(state): State<SharedState>) -> Json<SessionsResponse> {
    let sessions = state.store.list().await;
    Json(SessionsResponse {
        count: sessions.len(),
        sessions,
    })
}
