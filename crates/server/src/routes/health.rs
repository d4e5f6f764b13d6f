use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracking::SweepSummary;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Outcome of the most recent scheduled sweep, if one has finished.
    pub last_sweep: Option<SweepSummary>,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        last_sweep: state.last_sweep().await,
    })
}
