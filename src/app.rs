use crate::camera::Camera;
use crate::client::PoseEstimationClient;
use crate::config::Config;
use crate::frame_loop::FrameLoop;
use crate::geometry::FrameSize;
use crate::server::HttpServer;
use crate::session::{SessionStateMachine, SharedSession};
use crate::stream::VideoStream;
use crate::telemetry::Metrics;

use parking_lot::Mutex;
use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let camera: Arc<Camera> = match Camera::new().await {
        Ok(cam) => Arc::new(cam),
        Err(e) => {
            tracing::error!("Failed to initialize camera: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let client = match PoseEstimationClient::new(&config.estimator, &config.classifier) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to initialize pose estimation client: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let session: SharedSession = match SessionStateMachine::new(&config.session) {
        Ok(session) => Arc::new(Mutex::new(session)),
        Err(e) => {
            tracing::error!("Failed to initialize session: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let metrics = Arc::new(Metrics::new());

    let video_stream = VideoStream::new(camera.clone(), config.camera.get_stream_delay_ms());
    let server = HttpServer::new(video_stream, session.clone(), metrics.clone(), &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);

    let display_size = FrameSize::new(
        config.camera.display_width as f32,
        config.camera.display_height as f32,
    );
    let frame_loop = FrameLoop::new(
        camera,
        client,
        session,
        metrics,
        display_size,
        config.camera.get_inference_delay_ms(),
    );
    frame_loop.run(shutdown_tx.subscribe()).await;

    let server_handle = server.run(shutdown_tx.subscribe()).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
