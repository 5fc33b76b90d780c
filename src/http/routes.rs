//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Round, RoundState};
use crate::util::time::uptime_secs;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the status router
pub fn build_router(state: AppState) -> Router {
    // Read-only endpoints, open to any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/rounds", get(rounds_handler))
        .route("/rounds/:id", get(round_handler))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    running_rounds: usize,
    active_players: usize,
    open_rounds: usize,
    waiting_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let lobby = state.lobby.stats().await;

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        running_rounds: state.round_registry.active_rounds(),
        active_players: state.round_registry.active_players(),
        open_rounds: lobby.open_rounds,
        waiting_players: lobby.waiting_players,
    })
}

// ============================================================================
// Round endpoints
// ============================================================================

#[derive(Serialize)]
struct RoundSummary {
    id: Uuid,
    state: RoundState,
    players: Vec<PlayerSummary>,
}

#[derive(Serialize)]
struct PlayerSummary {
    name: String,
    seat: usize,
    bot: bool,
    health: i64,
    bombs: i64,
}

impl From<&Round> for RoundSummary {
    fn from(round: &Round) -> Self {
        Self {
            id: round.id,
            state: round.state(),
            players: round
                .players()
                .iter()
                .map(|p| PlayerSummary {
                    name: p.name.clone(),
                    seat: p.seat,
                    bot: p.is_bot(),
                    health: p.health(),
                    bombs: p.bombs(),
                })
                .collect(),
        }
    }
}

async fn rounds_handler(State(state): State<AppState>) -> Json<Vec<RoundSummary>> {
    let rounds = state.round_registry.snapshot();
    Json(rounds.iter().map(|r| RoundSummary::from(r.as_ref())).collect())
}

async fn round_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundSummary>, AppError> {
    let round = state
        .round_registry
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("round {id}")))?;
    Ok(Json(RoundSummary::from(round.as_ref())))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
