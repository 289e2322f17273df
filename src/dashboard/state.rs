//! Dashboard view state management

use egui::{Color32, ColorImage, TextureHandle, TextureOptions};
use std::time::Instant;

use crate::config::AppConfig;
use crate::scanner::ScanReport;
use crate::vision::{StageImage, Thresholds, STAGE_LABELS};

/// Severity of the status line under the controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// A texture updated in place as new frames arrive
pub struct TextureSlot {
    name: String,
    handle: Option<TextureHandle>,
}

impl TextureSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: None,
        }
    }

    /// Upload a new image, reusing the texture when one exists
    pub fn update(&mut self, ctx: &egui::Context, image: ColorImage) {
        match self.handle {
            Some(ref mut texture) => texture.set(image, TextureOptions::LINEAR),
            None => {
                self.handle = Some(ctx.load_texture(&self.name, image, TextureOptions::LINEAR));
            }
        }
    }

    pub fn texture(&self) -> Option<&TextureHandle> {
        self.handle.as_ref()
    }
}

impl std::fmt::Debug for TextureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureSlot")
            .field("name", &self.name)
            .field("handle", &self.handle.as_ref().map(|_| "<texture>"))
            .finish()
    }
}

/// Convert a pipeline stage into an egui image
pub fn stage_to_color_image(stage: StageImage<'_>) -> ColorImage {
    match stage {
        StageImage::Rgb(image) => ColorImage::from_rgb(
            [image.width() as usize, image.height() as usize],
            image.as_raw(),
        ),
        StageImage::Gray(image) => ColorImage::from_gray(
            [image.width() as usize, image.height() as usize],
            image.as_raw(),
        ),
        StageImage::Blank(width, height) => {
            ColorImage::new([width as usize, height as usize], Color32::BLACK)
        }
    }
}

/// Frames-per-second counter for the processed stream
#[derive(Debug)]
pub struct FrameCounter {
    frames_this_second: u32,
    last_fps_update: Instant,
    current_fps: f32,
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self {
            frames_this_second: 0,
            last_fps_update: Instant::now(),
            current_fps: 0.0,
        }
    }
}

impl FrameCounter {
    pub fn tick(&mut self) {
        self.frames_this_second += 1;

        let elapsed = self.last_fps_update.elapsed();
        if elapsed.as_secs_f32() >= 1.0 {
            self.current_fps = self.frames_this_second as f32 / elapsed.as_secs_f32();
            self.frames_this_second = 0;
            self.last_fps_update = Instant::now();
        }
    }

    pub fn fps(&self) -> f32 {
        self.current_fps
    }
}

/// Overall dashboard state
#[derive(Debug)]
pub struct DashboardState {
    /// Canny thresholds, bound to the trackbar sliders
    pub thresholds: Thresholds,
    /// Show the eight-stage grid under the camera view
    pub show_stages: bool,
    /// Scale of the stage thumbnails
    pub preview_scale: f32,
    /// Main camera view texture
    pub camera: TextureSlot,
    /// One texture per pipeline stage
    pub stages: Vec<TextureSlot>,
    /// Whether a document has been seen at least once this session
    pub document_detected: bool,
    /// Whether the latest frame contains a document
    pub document_in_frame: bool,
    pub contour_count: usize,
    pub last_processing_time_ms: u64,
    pub frame_counter: FrameCounter,
    /// Most recent scan
    pub last_report: Option<ScanReport>,
    /// Status line message
    pub status: Option<(String, StatusLevel)>,
    /// Scan requested from the UI this frame
    pub pending_scan: bool,
    /// Quit requested from the UI this frame
    pub pending_quit: bool,
}

impl DashboardState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            thresholds: Thresholds::from(&config.detection),
            show_stages: config.display.show_stages,
            preview_scale: config.display.preview_scale,
            camera: TextureSlot::new("camera"),
            stages: STAGE_LABELS
                .iter()
                .map(|label| TextureSlot::new(format!("stage_{}", label)))
                .collect(),
            document_detected: false,
            document_in_frame: false,
            contour_count: 0,
            last_processing_time_ms: 0,
            frame_counter: FrameCounter::default(),
            last_report: None,
            status: None,
            pending_scan: false,
            pending_quit: false,
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>, level: StatusLevel) {
        self.status = Some((message.into(), level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_rgb_stage_conversion() {
        let image = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        let color = stage_to_color_image(StageImage::Rgb(&image));

        assert_eq!(color.size, [4, 3]);
        assert_eq!(color.pixels[0], Color32::from_rgb(10, 20, 30));
    }

    #[test]
    fn test_gray_stage_conversion() {
        let image = GrayImage::from_pixel(2, 2, Luma([200]));
        let color = stage_to_color_image(StageImage::Gray(&image));

        assert_eq!(color.size, [2, 2]);
        assert_eq!(color.pixels[3], Color32::from_gray(200));
    }

    #[test]
    fn test_blank_stage_is_black() {
        let color = stage_to_color_image(StageImage::Blank(5, 4));
        assert_eq!(color.size, [5, 4]);
        assert!(color.pixels.iter().all(|p| *p == Color32::BLACK));
    }

    #[test]
    fn test_state_from_config() {
        let mut config = AppConfig::default();
        config.detection.threshold1 = 40;
        config.display.show_stages = true;

        let state = DashboardState::new(&config);

        assert_eq!(state.thresholds, Thresholds::new(40, 95));
        assert!(state.show_stages);
        assert_eq!(state.stages.len(), STAGE_LABELS.len());
        assert!(!state.document_detected);
    }

    #[test]
    fn test_texture_slot_reuses_handle() {
        let ctx = egui::Context::default();
        let mut slot = TextureSlot::new("test");
        assert!(slot.texture().is_none());

        slot.update(&ctx, ColorImage::new([2, 2], Color32::WHITE));
        let id = slot.texture().map(|t| t.id());
        slot.update(&ctx, ColorImage::new([3, 3], Color32::BLACK));

        assert_eq!(slot.texture().map(|t| t.id()), id);
    }
}
