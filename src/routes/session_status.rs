use crate::server::SharedState;
use axum::{extract::State, response::IntoResponse, response::Json};
use std::time::Instant;

/// Current prompt, target pose, and hold progress for the frontend to poll.
pub async fn session_status(State(state): State<SharedState>) -> impl IntoResponse {
    let snapshot = state.session.lock().snapshot(Instant::now());
    Json(snapshot)
}
