//! Circuit breaker administration.

use axum::Json;
use axum::extract::{Path, State};
use resilience::BreakerSnapshot;

use crate::AppState;
use crate::error::ApiError;

pub async fn list(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.breakers.snapshots())
}

pub async fn get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, ApiError> {
    state
        .breakers
        .snapshot(&name)
        .map(Json)
        .ok_or_else(|| not_found(&name))
}

/// Forces the named breaker back to closed.
pub async fn reset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, ApiError> {
    if !state.breakers.reset(&name) {
        return Err(not_found(&name));
    }
    tracing::info!(breaker = %name, "circuit breaker reset by operator");
    state
        .breakers
        .snapshot(&name)
        .map(Json)
        .ok_or_else(|| not_found(&name))
}

fn not_found(name: &str) -> ApiError {
    ApiError::NotFound(format!("circuit breaker '{name}' not found"))
}
