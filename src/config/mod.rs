//! Application Configuration
//!
//! Scanner settings stored in TOML format.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Frame source settings
    pub capture: CaptureSettings,
    /// Document detection settings
    pub detection: DetectionSettings,
    /// Scan output and OCR settings
    pub scan: ScanSettings,
    /// Window settings
    pub display: DisplaySettings,
}

/// Frame source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Read frames from the network camera instead of the static image
    pub use_camera: bool,
    /// MJPEG stream URL of the camera
    pub camera_url: String,
    /// Static image used when the camera is disabled
    pub image_path: PathBuf,
    /// Accept self-signed certificates (IP camera apps ship with one)
    pub accept_invalid_certs: bool,
    /// Delay before reconnecting to a dropped stream
    pub reconnect_delay_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            use_camera: true,
            camera_url: "https://172.26.0.35:8080/video".to_string(),
            image_path: PathBuf::from("Aadhaar.jpg"),
            accept_invalid_certs: true,
            reconnect_delay_ms: 1000,
        }
    }
}

/// Document detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Working width every frame is resized to
    pub frame_width: u32,
    /// Working height every frame is resized to
    pub frame_height: u32,
    /// Initial lower Canny threshold
    pub threshold1: u8,
    /// Initial upper Canny threshold
    pub threshold2: u8,
    /// Gaussian blur sigma before edge detection
    pub blur_sigma: f32,
    /// Morphology kernel radius (2 = 5x5)
    pub morph_radius: u8,
    /// Dilation passes over the edge map
    pub dilate_iterations: u32,
    /// Erosion passes after dilation
    pub erode_iterations: u32,
    /// Contours at or below this area are ignored
    pub min_contour_area: f64,
    /// Polygon approximation tolerance as a fraction of the perimeter
    pub approx_epsilon: f64,
    /// Adaptive threshold neighbourhood size (odd)
    pub adaptive_block_size: u32,
    /// Constant subtracted from the weighted neighbourhood mean
    pub adaptive_c: f32,
    /// Median filter radius applied to the adaptive threshold (1 = 3x3)
    pub median_radius: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            frame_width: 1000,
            frame_height: 650,
            threshold1: 65,
            threshold2: 95,
            blur_sigma: 1.0,
            morph_radius: 2,
            dilate_iterations: 2,
            erode_iterations: 1,
            min_contour_area: 5000.0,
            approx_epsilon: 0.02,
            adaptive_block_size: 7,
            adaptive_c: 2.0,
            median_radius: 1,
        }
    }
}

impl DetectionSettings {
    /// Reject values the image operations cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            bail!(
                "detection frame size must be non-zero, got {}x{}",
                self.frame_width,
                self.frame_height
            );
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            bail!(
                "adaptive_block_size must be odd and at least 3, got {}",
                self.adaptive_block_size
            );
        }
        if self.approx_epsilon.is_nan() || self.approx_epsilon <= 0.0 {
            bail!("approx_epsilon must be positive, got {}", self.approx_epsilon);
        }
        Ok(())
    }
}

/// Scan output and OCR settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Directory the rectified documents are written to
    pub output_dir: PathBuf,
    /// File name prefix, followed by the scan counter
    pub file_prefix: String,
    /// Tesseract language code
    pub ocr_language: String,
    /// Names must have more letters than this (spaces excluded)
    pub min_name_chars: usize,
    /// Scan requests are ignored for this long after a scan
    pub cooldown_ms: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("Scanned"),
            file_prefix: "myImage".to_string(),
            ocr_language: "eng".to_string(),
            min_name_chars: 10,
            cooldown_ms: 300,
        }
    }
}

/// Window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Show the eight-stage comparison grid
    pub show_stages: bool,
    /// Scale of the stage grid thumbnails relative to the working size
    pub preview_scale: f32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_stages: false,
            preview_scale: 0.6,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    config
        .detection
        .validate()
        .with_context(|| format!("Invalid detection settings in {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
