use crate::camera::Camera;
use crate::client::{ClientError, PoseEstimationClient};
use crate::gate::InferenceGate;
use crate::geometry::{map_estimate, ClassificationResult, FrameSize, Keypoint, PoseEstimate};
use crate::session::{SessionEvent, SharedSession};
use crate::telemetry::Metrics;
use std::sync::Arc;
use std::time::Instant;
use tokio::{
    sync::broadcast,
    time::{sleep, Duration},
};

/// Session context for the per-frame feedback loop. Owns nothing global:
/// constructed at session start by the caller, torn down via the shutdown
/// channel.
pub struct FrameLoop {
    camera: Arc<Camera>,
    client: Arc<PoseEstimationClient>,
    gate: Arc<InferenceGate>,
    session: SharedSession,
    metrics: Arc<Metrics>,
    display_size: FrameSize,
    tick_interval_ms: u64,
}

impl FrameLoop {
    pub fn new(
        camera: Arc<Camera>,
        client: Arc<PoseEstimationClient>,
        session: SharedSession,
        metrics: Arc<Metrics>,
        display_size: FrameSize,
        tick_interval_ms: u64,
    ) -> Self {
        Self {
            camera,
            client,
            gate: Arc::new(InferenceGate::new()),
            session,
            metrics,
            display_size,
            tick_interval_ms,
        }
    }

    /// Ticks at the configured cadence. Frame capture and streaming are
    /// never delayed by inference: when a request is in flight the tick
    /// simply skips dispatching, and the newest frame wins once the gate
    /// reopens.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let camera = self.camera.clone();
        let client = self.client.clone();
        let gate = self.gate.clone();
        let session = self.session.clone();
        let metrics = self.metrics.clone();
        let display_size = self.display_size;
        let tick_interval = Duration::from_millis(self.tick_interval_ms);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sleep(tick_interval) => {
                        if !gate.should_dispatch() {
                            continue;
                        }
                        match camera.capture_jpeg().await {
                            Ok(Some(jpeg)) => {
                                gate.on_dispatched();
                                tokio::spawn(run_inference(
                                    camera.clone(),
                                    client.clone(),
                                    gate.clone(),
                                    session.clone(),
                                    metrics.clone(),
                                    display_size,
                                    jpeg,
                                ));
                            }
                            Ok(None) => {}
                            Err(e) => {
                                tracing::error!("Failed to capture frame: {:?}", e);
                            }
                        }
                    },
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Frame loop received shutdown signal");
                        break;
                    }
                }
            }
            tracing::info!("Frame loop stopped");
        });
    }
}

/// One inference round trip: estimate, rescale, classify, feed the session.
/// Settles the gate on every path so a failure never blocks future
/// dispatches.
async fn run_inference(
    camera: Arc<Camera>,
    client: Arc<PoseEstimationClient>,
    gate: Arc<InferenceGate>,
    session: SharedSession,
    metrics: Arc<Metrics>,
    display_size: FrameSize,
    jpeg: Vec<u8>,
) {
    let started = Instant::now();
    let result = client.estimate(jpeg, display_size).await;
    metrics.record_estimation_duration(started.elapsed().as_millis() as u64);

    match result {
        Ok(estimates) => {
            let mapped: Result<Vec<PoseEstimate>, _> = estimates
                .iter()
                .map(|estimate| map_estimate(estimate, display_size))
                .collect();

            match mapped {
                Ok(mapped) => {
                    let outcome = if mapped.is_empty() { "empty" } else { "detected" };
                    metrics.record_estimation(outcome);

                    let classification = match classification_input(&mapped) {
                        Some(keypoints) => match client.classify(keypoints).await {
                            Ok(result) => Some(result),
                            Err(ClientError::NoPoseToClassify) => {
                                // classification_input already filtered this out
                                tracing::error!("classify called without keypoints");
                                None
                            }
                            Err(e) => {
                                tracing::warn!("Classification failed: {:?}", e);
                                None
                            }
                        },
                        None => None,
                    };

                    let prompt = apply_observation(&session, &metrics, classification.as_ref());
                    camera.set_overlay(mapped, prompt).await;
                }
                Err(e) => {
                    tracing::error!("Failed to rescale pose estimate: {:?}", e);
                    metrics.record_estimation("invalid_geometry");
                    apply_observation(&session, &metrics, None);
                }
            }
        }
        Err(e) => {
            tracing::error!("Pose estimation failed: {:?}", e);
            metrics.record_estimation("error");
            apply_observation(&session, &metrics, None);
        }
    }

    gate.on_settled();
}

/// Keypoints of the first detected pose, if it has any. An empty frame or a
/// detection without keypoints is treated as "no detection" upstream of the
/// classifier precondition.
fn classification_input(mapped: &[PoseEstimate]) -> Option<&[Keypoint]> {
    mapped
        .first()
        .filter(|pose| !pose.keypoints.is_empty())
        .map(|pose| pose.keypoints.as_slice())
}

fn apply_observation(
    session: &SharedSession,
    metrics: &Metrics,
    classification: Option<&ClassificationResult>,
) -> String {
    let mut guard = session.lock();
    let event = guard.observe(classification, Instant::now());
    if event == SessionEvent::PoseAdvanced {
        metrics.record_pose_advancement(guard.target_pose());
        tracing::info!("Pose held, advancing to {}", guard.target_pose());
    }
    guard.prompt().to_string()
}
