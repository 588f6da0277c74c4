//! HTTP gateway for Waypoint.
//!
//! Exposes the turn orchestrator over a small REST surface:
//!
//! - `POST /chat`: run one turn
//! - `GET /health`: liveness probe
//! - `GET /`: service info
//!
//! Built on Axum, with CORS restricted to the configured origins.

pub mod bootstrap;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use waypoint_agent::{Orchestrator, TurnRequest, TurnResponse};
use waypoint_config::AppConfig;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .layer(cors_layer(allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let orchestrator = bootstrap::build_orchestrator(&config, false).await?;
    let state = Arc::new(GatewayState {
        orchestrator: Arc::new(orchestrator),
    });
    let app = build_router(state, &config.gateway.allowed_origins);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct InfoResponse {
    service: &'static str,
    version: &'static str,
    endpoints: [&'static str; 3],
    agents: Vec<String>,
}

async fn root_handler(State(state): State<SharedState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        service: "Waypoint airline customer service",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ["POST /chat", "GET /health", "GET /"],
        agents: state
            .orchestrator
            .registry()
            .names()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(
        conversation_id = request.conversation_id.as_deref().unwrap_or("<new>"),
        message_len = request.message.len(),
        "Chat request"
    );

    state
        .orchestrator
        .handle_turn(request)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "Turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
        })
}
