use crate::config::{ClassifierConfig, EstimatorConfig};
use crate::geometry::{ClassificationResult, FrameSize, Keypoint, PoseEstimate, PoseLine};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("pose estimation unavailable: {0}")]
    EstimationUnavailable(String),
    #[error("pose classification unavailable: {0}")]
    ClassificationUnavailable(String),
    #[error("no pose to classify")]
    NoPoseToClassify,
    #[error("failed to build http client: {0}")]
    ClientBuildFailed(#[from] reqwest::Error),
}

// Estimator response, model-space coordinates.
#[derive(Debug, Deserialize)]
struct EstimationResponse {
    predictions: Vec<PredictionBody>,
    image_size: Option<ImageSize>,
}

#[derive(Debug, Deserialize)]
struct PredictionBody {
    body_parts: Vec<BodyPart>,
    #[serde(default)]
    pose_lines: Vec<PoseLineBody>,
}

#[derive(Debug, Deserialize)]
struct BodyPart {
    part_name: String,
    part_id: u32,
    x: f32,
    y: f32,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct PoseLineBody {
    line: [f32; 4],
}

#[derive(Debug, Deserialize)]
struct ImageSize {
    width: f32,
    height: f32,
}

/// Wraps the two remote calls of the feedback loop: the pose-estimation
/// model and the pose classifier. Holds no session state.
pub struct PoseEstimationClient {
    http_client: reqwest::Client,
    estimate_url: String,
    classify_url: String,
}

impl PoseEstimationClient {
    pub fn new(
        estimator_config: &EstimatorConfig,
        classifier_config: &ClassifierConfig,
    ) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(estimator_config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            estimate_url: estimator_config.get_predict_url(),
            classify_url: classifier_config.get_predict_url(),
        })
    }

    /// Submits one JPEG-encoded frame to the estimation model. Zero detected
    /// poses is an empty vec, not an error.
    #[instrument(skip(self, jpeg_frame))]
    pub async fn estimate(
        &self,
        jpeg_frame: Vec<u8>,
        fallback_size: FrameSize,
    ) -> Result<Vec<PoseEstimate>, ClientError> {
        let file_part = reqwest::multipart::Part::bytes(jpeg_frame)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| ClientError::EstimationUnavailable(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", file_part);

        let response = self
            .http_client
            .post(&self.estimate_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::EstimationUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::EstimationUnavailable(format!(
                "estimator returned {}",
                response.status()
            )));
        }

        let body: EstimationResponse = response
            .json()
            .await
            .map_err(|e| ClientError::EstimationUnavailable(e.to_string()))?;

        Ok(into_estimates(body, fallback_size))
    }

    /// Asks the classifier to label one detected pose. The caller must not
    /// invoke this with an empty keypoint set.
    #[instrument(skip(self, keypoints))]
    pub async fn classify(
        &self,
        keypoints: &[Keypoint],
    ) -> Result<ClassificationResult, ClientError> {
        if keypoints.is_empty() {
            return Err(ClientError::NoPoseToClassify);
        }

        let encoded = serde_json::to_string(keypoints)
            .map_err(|e| ClientError::ClassificationUnavailable(e.to_string()))?;
        let form = reqwest::multipart::Form::new().text("file", encoded);

        let response = self
            .http_client
            .post(&self.classify_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::ClassificationUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::ClassificationUnavailable(format!(
                "classifier returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::ClassificationUnavailable(e.to_string()))?;

        parse_classification(&body)
    }
}

fn into_estimates(response: EstimationResponse, fallback_size: FrameSize) -> Vec<PoseEstimate> {
    let source_size = response
        .image_size
        .map(|size| FrameSize::new(size.width, size.height))
        .unwrap_or(fallback_size);

    response
        .predictions
        .into_iter()
        .map(|prediction| PoseEstimate {
            keypoints: prediction
                .body_parts
                .into_iter()
                .map(|part| Keypoint {
                    part_name: part.part_name,
                    part_id: part.part_id,
                    x: part.x,
                    y: part.y,
                    score: part.score,
                })
                .collect(),
            lines: prediction
                .pose_lines
                .into_iter()
                .map(|body| PoseLine {
                    x1: body.line[0],
                    y1: body.line[1],
                    x2: body.line[2],
                    y2: body.line[3],
                })
                .collect(),
            source_size,
        })
        .collect()
}

// The classifier answers with plain text: "<label>,<confidence>".
fn parse_classification(body: &str) -> Result<ClassificationResult, ClientError> {
    let (label, confidence) = body
        .trim()
        .split_once(',')
        .ok_or_else(|| ClientError::ClassificationUnavailable(format!("malformed: {body:?}")))?;

    let confidence: f32 = confidence
        .trim()
        .parse()
        .map_err(|_| ClientError::ClassificationUnavailable(format!("malformed: {body:?}")))?;

    let label = label.trim();
    if label.is_empty() {
        return Err(ClientError::ClassificationUnavailable(format!(
            "malformed: {body:?}"
        )));
    }

    Ok(ClassificationResult {
        label: label.to_string(),
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_estimator_response() {
        let json = r#"{
            "predictions": [{
                "body_parts": [
                    {"part_name": "Nose", "part_id": 0, "x": 210.0, "y": 85.0, "score": 0.92}
                ],
                "pose_lines": [{"line": [210.0, 85.0, 230.0, 120.0]}]
            }],
            "image_size": {"width": 432.0, "height": 368.0}
        }"#;

        let response: EstimationResponse = serde_json::from_str(json).unwrap();
        let estimates = into_estimates(response, FrameSize::new(640.0, 480.0));

        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].keypoints[0].part_name, "Nose");
        assert_eq!(estimates[0].lines[0].y2, 120.0);
        assert_eq!(estimates[0].source_size, FrameSize::new(432.0, 368.0));
    }

    #[test]
    fn empty_predictions_decode_to_empty_vec() {
        let json = r#"{"predictions": [], "image_size": {"width": 432.0, "height": 368.0}}"#;

        let response: EstimationResponse = serde_json::from_str(json).unwrap();
        let estimates = into_estimates(response, FrameSize::new(640.0, 480.0));

        assert!(estimates.is_empty());
    }

    #[test]
    fn missing_image_size_falls_back_to_display_size() {
        let json = r#"{"predictions": [{"body_parts": [], "pose_lines": []}]}"#;

        let response: EstimationResponse = serde_json::from_str(json).unwrap();
        let estimates = into_estimates(response, FrameSize::new(640.0, 480.0));

        assert_eq!(estimates[0].source_size, FrameSize::new(640.0, 480.0));
    }

    #[test]
    fn parses_label_and_confidence() {
        let result = parse_classification("warrior,93.4\n").unwrap();
        assert_eq!(result.label, "warrior");
        assert_eq!(result.confidence, 93.4);
    }

    #[test]
    fn rejects_malformed_classifier_output() {
        assert!(matches!(
            parse_classification("warrior"),
            Err(ClientError::ClassificationUnavailable(_))
        ));
        assert!(matches!(
            parse_classification("warrior,not-a-number"),
            Err(ClientError::ClassificationUnavailable(_))
        ));
        assert!(matches!(
            parse_classification(",50.0"),
            Err(ClientError::ClassificationUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn classify_refuses_empty_keypoints_without_network() {
        let estimator = EstimatorConfig {
            host: "localhost".into(),
            port: 5000,
            request_timeout_secs: 1,
        };
        let classifier = ClassifierConfig {
            host: "localhost".into(),
            port: 3000,
        };
        let client = PoseEstimationClient::new(&estimator, &classifier).unwrap();

        let result = client.classify(&[]).await;
        assert!(matches!(result, Err(ClientError::NoPoseToClassify)));
    }
}
