//! Frame Capture Layer
//!
//! Frames come either from a network camera (MJPEG over HTTP) or from a static
//! image file that is handed out again on every poll.

pub mod camera;
pub mod frame;
pub mod mjpeg;

use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::CaptureSettings;

pub use camera::{CameraConfig, CameraStatus, CameraStream};
pub use frame::CapturedFrame;

/// Failures while opening or reading a frame source
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to load image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to spawn camera thread: {0}")]
    Thread(#[source] std::io::Error),
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("camera answered with HTTP status {0}")]
    Status(u16),
    #[error("camera stream ended")]
    StreamEnded,
    #[error("no data from camera for {0}s")]
    Stalled(u64),
}

/// Where frames come from
pub enum FrameSource {
    /// A single image file, re-served on every poll
    Still { path: PathBuf, image: RgbImage },
    /// A live MJPEG camera stream
    Camera(CameraStream),
}

impl FrameSource {
    /// Open the source selected by the capture settings
    pub fn open(settings: &CaptureSettings) -> Result<Self, CaptureError> {
        if settings.use_camera {
            info!("Opening camera stream {}", settings.camera_url);
            let stream = CameraStream::start(CameraConfig {
                url: settings.camera_url.clone(),
                accept_invalid_certs: settings.accept_invalid_certs,
                reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
            })?;
            Ok(Self::Camera(stream))
        } else {
            Self::still(&settings.image_path)
        }
    }

    /// Load a static image source
    pub fn still(path: &Path) -> Result<Self, CaptureError> {
        let image = image::open(path)
            .map_err(|source| CaptureError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();

        info!(
            "Loaded still image {:?} ({}x{})",
            path,
            image.width(),
            image.height()
        );

        Ok(Self::Still {
            path: path.to_path_buf(),
            image,
        })
    }

    /// Poll for a frame without blocking
    pub fn next_frame(&self) -> Option<CapturedFrame> {
        match self {
            Self::Still { image, .. } => Some(CapturedFrame::new(image.clone())),
            Self::Camera(stream) => stream.try_next_frame(),
        }
    }

    /// Wait up to `timeout` for a frame
    pub fn wait_frame(&self, timeout: Duration) -> Option<CapturedFrame> {
        match self {
            Self::Still { .. } => self.next_frame(),
            Self::Camera(stream) => stream.wait_frame(timeout),
        }
    }

    /// Whether every poll returns the same image
    pub fn is_still(&self) -> bool {
        matches!(self, Self::Still { .. })
    }

    /// Human readable description for the UI
    pub fn describe(&self) -> String {
        match self {
            Self::Still { path, .. } => format!("Image: {}", path.display()),
            Self::Camera(stream) => format!("Camera: {}", stream.url()),
        }
    }

    /// Camera connection state, `None` for still images
    pub fn camera_status(&self) -> Option<CameraStatus> {
        match self {
            Self::Still { .. } => None,
            Self::Camera(stream) => Some(stream.status()),
        }
    }
}
