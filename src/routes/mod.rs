mod capture_pose;
mod health;
mod metrics;
mod session_status;
mod video_feed;

use crate::server::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/video_feed", get(video_feed::video_feed))
        .route("/session", get(session_status::session_status))
        .route("/pose/{name}", post(capture_pose::capture_pose))
}
