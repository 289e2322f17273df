//! Dashboard application entry point

use eframe::egui;
use image::RgbImage;
use std::time::Duration;
use tracing::{info, warn};

use crate::capture::FrameSource;
use crate::config::AppConfig;
use crate::dashboard::state::{stage_to_color_image, DashboardState, StatusLevel};
use crate::dashboard::theme;
use crate::dashboard::views::{render_camera_view, render_controls_panel, SourceInfo};
use crate::extract::SCAN_FAILED_MESSAGE;
use crate::scanner::{ScanError, ScanSession};
use crate::vision::{DocumentPipeline, PipelineOutput, StageImage, Thresholds};

/// Repaint interval while polling the frame source
const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// The scanner window
pub struct ScannerApp {
    source: FrameSource,
    pipeline: DocumentPipeline,
    session: ScanSession,
    state: DashboardState,
    /// Most recent rectified document; kept after the card leaves the frame
    last_document: Option<RgbImage>,
    /// Inputs of the last processed still frame
    still_key: Option<(Thresholds, bool)>,
    /// Whether theme has been applied
    theme_applied: bool,
}

impl ScannerApp {
    pub fn new(config: &AppConfig, source: FrameSource, session: ScanSession) -> Self {
        Self {
            source,
            pipeline: DocumentPipeline::new(config.detection.clone()),
            session,
            state: DashboardState::new(config),
            last_document: None,
            still_key: None,
            theme_applied: false,
        }
    }

    /// Create eframe options for the scanner window
    pub fn options() -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1280.0, 760.0])
                .with_min_inner_size([800.0, 500.0])
                .with_title("ID Scanner"),
            ..Default::default()
        }
    }

    /// Pull a frame, run the pipeline and refresh the textures
    fn process_frame(&mut self, ctx: &egui::Context) {
        // A still image only needs reprocessing when the inputs change
        if self.source.is_still() {
            let key = (self.state.thresholds, self.state.show_stages);
            if self.still_key == Some(key) {
                return;
            }
            self.still_key = Some(key);
        }

        let Some(frame) = self.source.next_frame() else {
            return;
        };

        let output = self.pipeline.process(&frame.image, self.state.thresholds);
        self.state.frame_counter.tick();
        self.state.contour_count = output.contour_count;
        self.state.last_processing_time_ms = output.processing_time_ms;
        self.state.document_in_frame = output.document.is_some();

        if let Some(ref document) = output.document {
            if !self.state.document_detected {
                info!("Document detected, scanning enabled");
            }
            self.state.document_detected = true;
            self.last_document = Some(document.warped.clone());
        }

        self.update_textures(ctx, &output);
    }

    fn update_textures(&mut self, ctx: &egui::Context, output: &PipelineOutput) {
        self.state
            .camera
            .update(ctx, stage_to_color_image(StageImage::Rgb(output.camera_view())));

        if self.state.show_stages {
            for (slot, (_, stage)) in self.state.stages.iter_mut().zip(output.stages()) {
                slot.update(ctx, stage_to_color_image(stage));
            }
        }
    }

    /// Handle S / Q and the matching buttons
    fn handle_input(&mut self, ctx: &egui::Context) {
        let (scan_key, quit_key) = ctx.input(|i| (i.key_pressed(egui::Key::S), i.key_pressed(egui::Key::Q)));

        if quit_key || std::mem::take(&mut self.state.pending_quit) {
            info!("Quit requested");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        let scan_button = std::mem::take(&mut self.state.pending_scan);
        if (scan_key || scan_button) && self.state.document_detected {
            self.scan();
        }
    }

    fn scan(&mut self) {
        match self.session.scan(self.last_document.as_ref()) {
            Ok(report) => {
                let level = if report.is_found() {
                    StatusLevel::Info
                } else {
                    StatusLevel::Warning
                };
                self.state
                    .set_status(format!("Saved {}", report.path.display()), level);
                self.state.last_report = Some(report);
            }
            Err(ScanError::CoolingDown) => {}
            Err(ScanError::NoDocument) => {
                self.state
                    .set_status("No document detected yet", StatusLevel::Warning);
            }
            Err(e) => {
                warn!("Scan failed: {}", e);
                println!("{}", SCAN_FAILED_MESSAGE);
                self.state.set_status(e.to_string(), StatusLevel::Error);
            }
        }
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            description: self.source.describe(),
            camera: self.source.camera_status(),
        }
    }
}

impl eframe::App for ScannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply theme once
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        self.process_frame(ctx);
        self.handle_input(ctx);

        let source = self.source_info();
        egui::SidePanel::right("controls")
            .resizable(false)
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    render_controls_panel(ui, &mut self.state, &source);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none().inner_margin(12.0).show(ui, |ui| {
                render_camera_view(ui, &self.state);
            });
        });

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

/// Run the scanner window until it is closed
pub fn run_dashboard(
    config: &AppConfig,
    source: FrameSource,
    session: ScanSession,
) -> Result<(), eframe::Error> {
    let app = ScannerApp::new(config, source, session);
    eframe::run_native(
        "ID Scanner",
        ScannerApp::options(),
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
