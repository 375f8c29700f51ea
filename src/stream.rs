use crate::camera::Camera;
use crate::camera::CameraError;
use bytes::Bytes;
use futures::stream;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::sleep;
use tracing::instrument;

pub const FRAME_BOUNDARY: &str = "frame";
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

fn mjpeg_part_header(frame_len: usize) -> String {
    format!(
        "--{FRAME_BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {frame_len}\r\n\r\n"
    )
}

/// MJPEG stream of annotated frames: live video with the current skeleton
/// overlay and session prompt stamped on.
#[derive(Clone)]
pub struct VideoStream {
    pub camera: Arc<Camera>,
    pub video_stream_delay: u64,
}

#[derive(Error, Debug)]
pub enum VideoStreamError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("Http builder error: {0}")]
    HttpBuilderError(String),
}

impl VideoStream {
    pub fn new(camera: Arc<Camera>, video_stream_delay: u64) -> Self {
        Self {
            camera,
            video_stream_delay,
        }
    }

    #[instrument(skip(self))]
    pub fn generate_stream(self) -> impl futures::Stream<Item = Result<Bytes, VideoStreamError>> {
        let camera = self.camera.clone();

        stream::unfold(camera, move |camera| async move {
            sleep(Duration::from_millis(self.video_stream_delay)).await;
            match camera.get_annotated_frame().await {
                Ok(Some(frame)) => {
                    let mut body = mjpeg_part_header(frame.len()).into_bytes();
                    body.extend_from_slice(&frame);
                    body.extend_from_slice(b"\r\n");
                    Some((Ok::<_, VideoStreamError>(Bytes::from(body)), camera))
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::error!("Error getting frame: {:?}", e);
                    Some((Err(VideoStreamError::from(e)), camera))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_header_matches_the_advertised_boundary() {
        assert!(MJPEG_CONTENT_TYPE.ends_with(&format!("boundary={FRAME_BOUNDARY}")));

        let header = mjpeg_part_header(42);
        assert!(header.starts_with(&format!("--{FRAME_BOUNDARY}\r\n")));
        assert!(header.contains("Content-Length: 42"));
        assert!(header.ends_with("\r\n\r\n"));
    }
}
