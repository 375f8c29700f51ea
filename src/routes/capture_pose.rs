use crate::server::SharedState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum CapturePoseError {
    #[error("invalid pose name: {0}")]
    InvalidPoseName(String),
    #[error("Failed to store capture: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for CapturePoseError {
    fn into_response(self) -> Response {
        let status = match self {
            CapturePoseError::InvalidPoseName(_) => StatusCode::BAD_REQUEST,
            CapturePoseError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Stores a captured frame as a training image for the named pose. Files are
/// numbered by the current count in the pose directory.
#[instrument(skip(state, image_data))]
pub async fn capture_pose(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    image_data: Bytes,
) -> Result<Response, CapturePoseError> {
    let dir = pose_dir(&state.capture_dir, &name)?;
    tokio::fs::create_dir_all(&dir).await?;

    let path = next_capture_path(&dir).await?;
    tokio::fs::write(&path, &image_data).await?;
    tracing::info!("Stored pose capture at {:?}", path);

    Ok(StatusCode::CREATED.into_response())
}

// The next file name is the current count in the pose directory.
async fn next_capture_path(dir: &std::path::Path) -> Result<PathBuf, CapturePoseError> {
    let mut count: usize = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while entries.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(dir.join(format!("{count}.jpg")))
}

fn pose_dir(capture_dir: &std::path::Path, name: &str) -> Result<PathBuf, CapturePoseError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(CapturePoseError::InvalidPoseName(name.to_string()));
    }
    Ok(capture_dir.join(name))
}
