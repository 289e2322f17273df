//! Vision Layer
//!
//! Turns a raw frame into a rectified document: edge map, outer contours,
//! four-corner selection and perspective warp. Every intermediate image is
//! kept so the dashboard can show the whole chain.

pub mod contour;
pub mod draw;
pub mod preprocess;
pub mod warp;

use image::{GrayImage, RgbImage};
use std::time::Instant;
use tracing::debug;

use crate::config::DetectionSettings;

pub use contour::Quad;

/// Stroke width of the all-contours overlay
const CONTOUR_THICKNESS: u32 = 10;
/// Corner dot size on the biggest-contour overlay
const CORNER_DOT_SIZE: u32 = 20;
/// Edge width on the biggest-contour overlay
const QUAD_LINE_THICKNESS: u32 = 2;

/// Canny threshold pair, driven by the trackbars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub low: u8,
    pub high: u8,
}

impl Thresholds {
    pub fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }
}

impl From<&DetectionSettings> for Thresholds {
    fn from(settings: &DetectionSettings) -> Self {
        Self::new(settings.threshold1, settings.threshold2)
    }
}

/// Rectified document and the views derived from it
#[derive(Debug, Clone)]
pub struct RectifiedDocument {
    /// Ordered outline in working-frame coordinates
    pub quad: Quad,
    /// Frame with the outline drawn on it
    pub outline: RgbImage,
    /// Top-down colour view
    pub warped: RgbImage,
    /// Top-down grayscale view
    pub warped_gray: RgbImage,
    /// Binarised top-down view
    pub binary: GrayImage,
}

/// All stages produced for one frame
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Frame at working size
    pub original: RgbImage,
    pub gray: GrayImage,
    /// Closed Canny edge map
    pub edges: GrayImage,
    /// Frame with every outer contour drawn
    pub contours: RgbImage,
    /// Number of outer contours found
    pub contour_count: usize,
    /// Present when a four-cornered document was found
    pub document: Option<RectifiedDocument>,
    pub processing_time_ms: u64,
}

/// A borrowed stage image for display
#[derive(Debug, Clone, Copy)]
pub enum StageImage<'a> {
    Rgb(&'a RgbImage),
    Gray(&'a GrayImage),
    /// Nothing to show at this size
    Blank(u32, u32),
}

/// Labels of the stage grid, row by row
pub const STAGE_LABELS: [&str; 8] = [
    "Original",
    "Gray",
    "Threshold",
    "Contours",
    "Biggest Contour",
    "Warp Perspective",
    "Warp Gray",
    "Adaptive Threshold",
];

impl PipelineOutput {
    /// The eight stages in grid order; document stages are blank when
    /// nothing was detected
    pub fn stages(&self) -> [(&'static str, StageImage<'_>); 8] {
        [
            (STAGE_LABELS[0], StageImage::Rgb(&self.original)),
            (STAGE_LABELS[1], StageImage::Gray(&self.gray)),
            (STAGE_LABELS[2], StageImage::Gray(&self.edges)),
            (STAGE_LABELS[3], StageImage::Rgb(&self.contours)),
            (STAGE_LABELS[4], self.document_stage(|d| StageImage::Rgb(&d.outline))),
            (STAGE_LABELS[5], self.document_stage(|d| StageImage::Rgb(&d.warped))),
            (STAGE_LABELS[6], self.document_stage(|d| StageImage::Rgb(&d.warped_gray))),
            (STAGE_LABELS[7], self.document_stage(|d| StageImage::Gray(&d.binary))),
        ]
    }

    fn document_stage<'a>(
        &'a self,
        pick: impl Fn(&'a RectifiedDocument) -> StageImage<'a>,
    ) -> StageImage<'a> {
        match &self.document {
            Some(doc) => pick(doc),
            None => {
                let (w, h) = self.original.dimensions();
                StageImage::Blank(w, h)
            }
        }
    }

    /// The view shown in the main camera panel
    pub fn camera_view(&self) -> &RgbImage {
        &self.contours
    }
}

/// Document detection and rectification pipeline
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    settings: DetectionSettings,
}

impl DocumentPipeline {
    pub fn new(settings: DetectionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    /// Working size (width, height) frames are normalised to
    pub fn frame_size(&self) -> (u32, u32) {
        (self.settings.frame_width, self.settings.frame_height)
    }

    /// Run the full chain on one frame
    pub fn process(&self, frame: &RgbImage, thresholds: Thresholds) -> PipelineOutput {
        let start = Instant::now();
        let (width, height) = self.frame_size();

        let original = preprocess::resize_frame(frame, width, height);
        let gray = preprocess::to_gray(&original);
        let blurred = preprocess::blur(&gray, self.settings.blur_sigma);
        let edges = preprocess::edge_map(&blurred, thresholds.low, thresholds.high, &self.settings);

        let outer = contour::external_contours(&edges);
        let contours = draw::draw_contours(&original, &outer, CONTOUR_THICKNESS);

        let document = contour::biggest_contour(
            &outer,
            self.settings.min_contour_area,
            self.settings.approx_epsilon,
        )
        .and_then(|(corners, area)| self.rectify(&original, Quad::from_unordered(corners, area)));

        let processing_time = start.elapsed();
        debug!(
            "Pipeline ({}/{}) complete in {:?}: {} contours, document: {}",
            thresholds.low,
            thresholds.high,
            processing_time,
            outer.len(),
            document.is_some()
        );

        PipelineOutput {
            original,
            gray,
            edges,
            contours,
            contour_count: outer.len(),
            document,
            processing_time_ms: processing_time.as_millis() as u64,
        }
    }

    fn rectify(&self, original: &RgbImage, quad: Quad) -> Option<RectifiedDocument> {
        let (width, height) = self.frame_size();
        let warped = warp::rectify(original, &quad, width, height)?;
        let gray = preprocess::to_gray(&warped);
        let binary = preprocess::binarize_document(&gray, &self.settings);
        let warped_gray = image::DynamicImage::ImageLuma8(gray).to_rgb8();

        Some(RectifiedDocument {
            outline: draw::draw_quad(original, &quad, CORNER_DOT_SIZE, QUAD_LINE_THICKNESS),
            quad,
            warped,
            warped_gray,
            binary,
        })
    }
}
