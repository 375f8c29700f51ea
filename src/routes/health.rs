use axum::{response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Status {
    service: String,
    status: String,
}

pub async fn healthcheck() -> impl IntoResponse {
    Json(Status {
        service: "pose_coach".into(),
        status: "Available".into(),
    })
}
