//! OCR Layer
//!
//! Text recognition behind a small engine trait. The shipped backend drives
//! the system `tesseract` binary; tests plug in canned engines.

pub mod tesseract;

use image::DynamicImage;
use thiserror::Error;

pub use tesseract::TesseractEngine;

/// OCR failures
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("tesseract is not available: {0}")]
    Unavailable(String),
    #[error("failed to prepare image for OCR: {0}")]
    Image(String),
    #[error("recognition failed: {0}")]
    Recognition(String),
}

/// One recognised line of text
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    /// Words of the line joined by single spaces
    pub text: String,
    /// Bounding box (x, y, width, height)
    pub bounds: (u32, u32, u32, u32),
    /// Mean word confidence (0.0 - 1.0)
    pub confidence: f32,
}

/// A text recognition backend
pub trait OcrEngine {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Recognise the lines of text in an image, top to bottom
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>, OcrError>;
}
