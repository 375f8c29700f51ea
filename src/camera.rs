use crate::geometry::PoseEstimate;
use opencv::{core, core::Mat, imgcodecs, imgproc, prelude::*, videoio};
use thiserror::Error;
use tokio::sync::Mutex;

const POINT_RADIUS: i32 = 4;
const LINE_WIDTH: i32 = 2;

// OpenPose/COCO drawing palette, indexed by part id (and by line index for
// the skeleton segments).
const PART_COLORS: [(f64, f64, f64); 18] = [
    (255.0, 0.0, 0.0),
    (255.0, 85.0, 0.0),
    (255.0, 170.0, 0.0),
    (255.0, 255.0, 0.0),
    (170.0, 255.0, 0.0),
    (85.0, 255.0, 0.0),
    (0.0, 255.0, 0.0),
    (0.0, 255.0, 85.0),
    (0.0, 255.0, 170.0),
    (0.0, 255.0, 255.0),
    (0.0, 170.0, 255.0),
    (0.0, 85.0, 255.0),
    (0.0, 0.0, 255.0),
    (85.0, 0.0, 255.0),
    (170.0, 0.0, 255.0),
    (255.0, 0.0, 255.0),
    (255.0, 0.0, 170.0),
    (255.0, 0.0, 85.0),
];

fn part_color(index: usize) -> core::Scalar {
    let (r, g, b) = PART_COLORS[index % PART_COLORS.len()];
    core::Scalar::new(b, g, r, 0.0)
}

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    OpenCameraFailed(opencv::Error),
    #[error("Failed to read frame: {0}")]
    ReadFrameFailed(opencv::Error),
    #[error("Failed to encode frame: {0}")]
    EncodeFrameFailed(opencv::Error),
    #[error("OpenCV error: {0}")]
    OpenCvError(opencv::Error),
}

impl From<opencv::Error> for CameraError {
    fn from(err: opencv::Error) -> Self {
        CameraError::OpenCvError(err)
    }
}

/// Latest display-space skeletons plus the session prompt, stamped onto
/// every outgoing frame until the next inference result replaces them.
#[derive(Debug, Default)]
pub struct Overlay {
    pub poses: Vec<PoseEstimate>,
    pub prompt: String,
}

#[derive(Debug)]
pub struct Camera {
    pub capture: Mutex<videoio::VideoCapture>,
    pub overlay: Mutex<Overlay>,
}

impl Camera {
    pub async fn new() -> Result<Self, CameraError> {
        let capture = videoio::VideoCapture::new(0, videoio::CAP_ANY)
            .map_err(CameraError::OpenCameraFailed)?;
        Ok(Self {
            capture: Mutex::new(capture),
            overlay: Mutex::new(Overlay::default()),
        })
    }

    pub async fn capture_frame(&self) -> Result<Mat, CameraError> {
        let mut cam = self.capture.lock().await;
        let mut frame = Mat::default();
        cam.read(&mut frame).map_err(CameraError::ReadFrameFailed)?;
        Ok(frame)
    }

    /// Captures one frame without annotations, JPEG-encoded for the
    /// estimation request. `None` when the device produced an empty frame.
    pub async fn capture_jpeg(&self) -> Result<Option<Vec<u8>>, CameraError> {
        let frame = self.capture_frame().await?;
        if frame.empty() {
            return Ok(None);
        }
        let mut buf = opencv::core::Vector::<u8>::new();
        imgcodecs::imencode(".jpg", &frame, &mut buf, &opencv::core::Vector::new())
            .map_err(CameraError::EncodeFrameFailed)?;
        Ok(Some(buf.into()))
    }

    pub async fn set_overlay(&self, poses: Vec<PoseEstimate>, prompt: String) {
        let mut overlay = self.overlay.lock().await;
        overlay.poses = poses;
        overlay.prompt = prompt;
    }

    pub async fn get_annotated_frame(&self) -> Result<Option<Vec<u8>>, CameraError> {
        let mut cam = self.capture.lock().await;
        let mut frame = Mat::default();
        if cam.read(&mut frame).map_err(CameraError::ReadFrameFailed)? && !frame.empty() {
            let overlay = self.overlay.lock().await;
            for pose in overlay.poses.iter() {
                draw_skeleton(&mut frame, pose)?;
            }
            if !overlay.prompt.is_empty() {
                draw_prompt(&mut frame, &overlay.prompt)?;
            }
            let mut buf = opencv::core::Vector::<u8>::new();
            imgcodecs::imencode(".jpg", &frame, &mut buf, &opencv::core::Vector::new())
                .map_err(CameraError::EncodeFrameFailed)?;
            return Ok(Some(buf.into()));
        }
        Ok(None)
    }
}

fn draw_skeleton(frame: &mut Mat, pose: &PoseEstimate) -> Result<(), CameraError> {
    for (index, line) in pose.lines.iter().enumerate() {
        imgproc::line(
            frame,
            core::Point::new(line.x1 as i32, line.y1 as i32),
            core::Point::new(line.x2 as i32, line.y2 as i32),
            part_color(index),
            LINE_WIDTH,
            imgproc::LINE_AA,
            0,
        )
        .map_err(CameraError::from)?;
    }

    for part in pose.keypoints.iter() {
        imgproc::circle(
            frame,
            core::Point::new(part.x as i32, part.y as i32),
            POINT_RADIUS,
            part_color(part.part_id as usize),
            imgproc::FILLED,
            imgproc::LINE_AA,
            0,
        )
        .map_err(CameraError::from)?;
    }

    Ok(())
}

fn draw_prompt(frame: &mut Mat, prompt: &str) -> Result<(), CameraError> {
    imgproc::put_text(
        frame,
        prompt,
        core::Point::new(10, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.8,
        core::Scalar::new(255.0, 255.0, 255.0, 0.0),
        2,
        imgproc::LINE_AA,
        false,
    )
    .map_err(CameraError::from)?;
    Ok(())
}
