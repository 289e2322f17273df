//! Controls panel - trackbars, source status and the last scan

use egui::RichText;

use crate::capture::CameraStatus;
use crate::dashboard::components::{CardStatus, StatusCard};
use crate::dashboard::state::DashboardState;
use crate::dashboard::theme::{status_color, ThemeColors};
use crate::extract::{DobField, SCAN_FAILED_MESSAGE};
use crate::scanner::ScanReport;

/// What the controls panel shows about the frame source
pub struct SourceInfo {
    pub description: String,
    /// `None` for a still image
    pub camera: Option<CameraStatus>,
}

/// Render the side panel
pub fn render_controls_panel(ui: &mut egui::Ui, state: &mut DashboardState, source: &SourceInfo) {
    ui.heading(RichText::new("Trackbars").strong());
    ui.add_space(6.0);
    ui.add(egui::Slider::new(&mut state.thresholds.low, 0..=255).text("Threshold1"));
    ui.add(egui::Slider::new(&mut state.thresholds.high, 0..=255).text("Threshold2"));
    ui.checkbox(&mut state.show_stages, "Show all stages");

    ui.add_space(12.0);
    source_card(source).show(ui);
    ui.add_space(6.0);
    ui.label(
        RichText::new(format!(
            "{:.1} FPS  |  {} ms  |  {} contours",
            state.frame_counter.fps(),
            state.last_processing_time_ms,
            state.contour_count
        ))
        .size(12.0)
        .color(ThemeColors::TEXT_MUTED),
    );

    ui.add_space(12.0);
    ui.horizontal(|ui| {
        let scan = ui.add_enabled(state.document_detected, egui::Button::new("Scan (S)"));
        if scan.clicked() {
            state.pending_scan = true;
        }
        if ui.button("Quit (Q)").clicked() {
            state.pending_quit = true;
        }
    });
    if !state.document_detected {
        ui.label(
            RichText::new("Hold a card in front of the camera to enable scanning")
                .size(12.0)
                .color(ThemeColors::TEXT_MUTED),
        );
    }

    if let Some((ref message, level)) = state.status {
        ui.add_space(6.0);
        ui.label(RichText::new(message).color(status_color(level)));
    }

    if let Some(ref report) = state.last_report {
        ui.add_space(12.0);
        ui.separator();
        render_report(ui, report);
    }
}

fn source_card(source: &SourceInfo) -> StatusCard {
    match &source.camera {
        None => StatusCard::new("Source", &source.description, CardStatus::Active),
        Some(status) => {
            let card_status = if status.connected {
                CardStatus::Active
            } else if status.last_error.is_some() {
                CardStatus::Error
            } else {
                CardStatus::Waiting
            };
            let card = StatusCard::new("Source", &source.description, card_status);
            match (&status.last_error, status.connected) {
                (Some(error), false) => card.with_detail(error),
                _ => card.with_detail(format!("{} frames", status.frames_received)),
            }
        }
    }
}

/// Last scan result, mirroring the console output
fn render_report(ui: &mut egui::Ui, report: &ScanReport) {
    ui.label(RichText::new(format!("Scan #{}", report.index)).strong());
    ui.label(
        RichText::new(report.path.display().to_string())
            .size(12.0)
            .color(ThemeColors::TEXT_MUTED),
    );
    ui.add_space(4.0);

    let record = &report.record;
    if !record.is_found() {
        ui.label(
            RichText::new(SCAN_FAILED_MESSAGE)
                .color(ThemeColors::ACCENT_ERROR),
        );
    }

    egui::Grid::new("scan_report").num_columns(2).show(ui, |ui| {
        for name in &record.names {
            ui.label("Name:");
            ui.label(RichText::new(name).strong());
            ui.end_row();
        }
        match &record.dob {
            Some(DobField::Valid { text, age, .. }) => {
                ui.label("DOB:");
                ui.label(text);
                ui.end_row();
                ui.label("Age:");
                ui.label(age.to_string());
                ui.end_row();
            }
            Some(DobField::Invalid { raw }) => {
                ui.label("DOB:");
                ui.label(
                    RichText::new(format!("No valid DOB found ({})", raw))
                        .color(ThemeColors::ACCENT_WARNING),
                );
                ui.end_row();
            }
            None => {}
        }
        if let Some(gender) = record.gender {
            ui.label("Gender:");
            ui.label(gender.as_str());
            ui.end_row();
        }
        if let Some(ref id) = record.id_number {
            ui.label("ID Number:");
            ui.label(RichText::new(id).monospace());
            ui.end_row();
        }
    });

    if !report.lines.is_empty() {
        egui::CollapsingHeader::new(format!("OCR text ({} lines)", report.lines.len()))
            .id_salt("ocr_lines")
            .show(ui, |ui| {
                for line in &report.lines {
                    ui.label(
                        RichText::new(format!("{:>3.0}%  {}", line.confidence * 100.0, line.text))
                            .size(12.0)
                            .monospace(),
                    );
                }
            });
    }
}
