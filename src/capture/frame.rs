//! Frame data structures for captured camera content

use image::RgbImage;
use std::time::Instant;

/// A captured frame from the camera or the static image
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Decoded RGB pixels
    pub image: RgbImage,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl CapturedFrame {
    /// Create a new captured frame
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            timestamp: Instant::now(),
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
