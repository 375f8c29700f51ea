use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("invalid model geometry: {width}x{height}")]
    InvalidGeometry { width: f32, height: f32 },
}

/// One detected body part in a given coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keypoint {
    pub part_name: String,
    pub part_id: u32,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

/// A skeletal connection between two joints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoseLine {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameSize {
    pub width: f32,
    pub height: f32,
}

impl FrameSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// One detected person. Coordinates are in the space of `source_size`
/// until mapped to display space.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEstimate {
    pub keypoints: Vec<Keypoint>,
    pub lines: Vec<PoseLine>,
    pub source_size: FrameSize,
}

/// Output of the pose classifier, confidence in [0, 100].
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f32,
}

fn scale_factors(model: FrameSize, display: FrameSize) -> Result<(f32, f32), GeometryError> {
    if model.width == 0.0 || model.height == 0.0 {
        return Err(GeometryError::InvalidGeometry {
            width: model.width,
            height: model.height,
        });
    }
    Ok((display.width / model.width, display.height / model.height))
}

/// Rescales a keypoint from model space to display space. Axes scale
/// independently, the aspect ratios need not match.
pub fn map_keypoint(
    part: &Keypoint,
    model: FrameSize,
    display: FrameSize,
) -> Result<Keypoint, GeometryError> {
    let (sx, sy) = scale_factors(model, display)?;
    Ok(Keypoint {
        part_name: part.part_name.clone(),
        part_id: part.part_id,
        x: part.x * sx,
        y: part.y * sy,
        score: part.score,
    })
}

/// Rescales both endpoints of a pose line from model space to display space.
pub fn map_line(
    line: &PoseLine,
    model: FrameSize,
    display: FrameSize,
) -> Result<PoseLine, GeometryError> {
    let (sx, sy) = scale_factors(model, display)?;
    Ok(PoseLine {
        x1: line.x1 * sx,
        y1: line.y1 * sy,
        x2: line.x2 * sx,
        y2: line.y2 * sy,
    })
}

/// Rescales a whole estimate into display space. The returned estimate
/// carries `display` as its source size.
pub fn map_estimate(
    estimate: &PoseEstimate,
    display: FrameSize,
) -> Result<PoseEstimate, GeometryError> {
    let model = estimate.source_size;
    let keypoints = estimate
        .keypoints
        .iter()
        .map(|part| map_keypoint(part, model, display))
        .collect::<Result<Vec<_>, _>>()?;
    let lines = estimate
        .lines
        .iter()
        .map(|line| map_line(line, model, display))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PoseEstimate {
        keypoints,
        lines,
        source_size: display,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypoint(x: f32, y: f32) -> Keypoint {
        Keypoint {
            part_name: "Nose".into(),
            part_id: 0,
            x,
            y,
            score: 0.9,
        }
    }

    #[test]
    fn keypoint_scales_per_axis() {
        let model = FrameSize::new(432.0, 368.0);
        let display = FrameSize::new(640.0, 480.0);
        let part = keypoint(216.0, 92.0);

        let mapped = map_keypoint(&part, model, display).unwrap();

        assert_eq!(mapped.x, 216.0 * 640.0 / 432.0);
        assert_eq!(mapped.y, 92.0 * 480.0 / 368.0);
        assert_eq!(mapped.part_name, part.part_name);
        assert_eq!(mapped.score, part.score);
    }

    #[test]
    fn line_scales_both_endpoints() {
        let model = FrameSize::new(100.0, 200.0);
        let display = FrameSize::new(200.0, 100.0);
        let line = PoseLine {
            x1: 10.0,
            y1: 20.0,
            x2: 50.0,
            y2: 100.0,
        };

        let mapped = map_line(&line, model, display).unwrap();

        assert_eq!(
            mapped,
            PoseLine {
                x1: 20.0,
                y1: 10.0,
                x2: 100.0,
                y2: 50.0,
            }
        );
    }

    #[test]
    fn zero_model_dimension_is_invalid_geometry() {
        let display = FrameSize::new(640.0, 480.0);
        let part = keypoint(1.0, 1.0);

        let err = map_keypoint(&part, FrameSize::new(0.0, 368.0), display).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidGeometry { .. }));

        let err = map_keypoint(&part, FrameSize::new(432.0, 0.0), display).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidGeometry { .. }));
    }

    #[test]
    fn mapping_is_deterministic() {
        let model = FrameSize::new(432.0, 368.0);
        let display = FrameSize::new(640.0, 480.0);
        let part = keypoint(123.4, 56.7);

        let first = map_keypoint(&part, model, display).unwrap();
        let second = map_keypoint(&part, model, display).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn estimate_maps_all_parts_and_lines() {
        let estimate = PoseEstimate {
            keypoints: vec![keypoint(10.0, 10.0), keypoint(20.0, 20.0)],
            lines: vec![PoseLine {
                x1: 10.0,
                y1: 10.0,
                x2: 20.0,
                y2: 20.0,
            }],
            source_size: FrameSize::new(320.0, 240.0),
        };
        let display = FrameSize::new(640.0, 480.0);

        let mapped = map_estimate(&estimate, display).unwrap();

        assert_eq!(mapped.keypoints.len(), 2);
        assert_eq!(mapped.keypoints[0].x, 20.0);
        assert_eq!(mapped.lines[0].x2, 40.0);
        assert_eq!(mapped.source_size, display);
    }
}
