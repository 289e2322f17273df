//! Camera view - live contours overlay and the stage grid

use egui::RichText;

use crate::dashboard::state::{DashboardState, TextureSlot};
use crate::dashboard::theme::ThemeColors;
use crate::vision::STAGE_LABELS;

/// Thumbnails per row in the stage grid
const STAGE_COLUMNS: usize = 4;

/// Render the camera view and, when enabled, the stage grid
pub fn render_camera_view(ui: &mut egui::Ui, state: &DashboardState) {
    ui.horizontal(|ui| {
        ui.heading(RichText::new("Camera").strong());
        ui.add_space(12.0);
        let (text, color) = if state.document_in_frame {
            ("Document detected", ThemeColors::ACCENT_SUCCESS)
        } else {
            ("Searching...", ThemeColors::TEXT_MUTED)
        };
        ui.label(RichText::new(text).color(color));
    });
    ui.add_space(8.0);

    egui::ScrollArea::vertical().show(ui, |ui| {
        let width = ui.available_width();
        let max_height = if state.show_stages {
            ui.available_height() * 0.55
        } else {
            ui.available_height()
        };
        render_texture(ui, &state.camera, width, max_height, "Waiting for first frame...");

        if state.show_stages {
            ui.add_space(12.0);
            render_stage_grid(ui, state);
        }
    });
}

/// Eight pipeline stages in two rows, labelled like the comparison window
fn render_stage_grid(ui: &mut egui::Ui, state: &DashboardState) {
    let spacing = ui.spacing().item_spacing.x;
    let cell_width =
        ((ui.available_width() - spacing * (STAGE_COLUMNS as f32 - 1.0)) / STAGE_COLUMNS as f32)
            .max(40.0)
            * state.preview_scale.clamp(0.1, 1.0);

    egui::Grid::new("stage_grid")
        .spacing([spacing, 8.0])
        .show(ui, |ui| {
            for (index, (slot, label)) in state.stages.iter().zip(STAGE_LABELS).enumerate() {
                ui.vertical(|ui| {
                    ui.label(RichText::new(label).size(12.0).color(ThemeColors::TEXT_SECONDARY));
                    render_texture(ui, slot, cell_width, f32::INFINITY, "-");
                });
                if (index + 1) % STAGE_COLUMNS == 0 {
                    ui.end_row();
                }
            }
        });
}

/// Draw a texture scaled to fit, or a placeholder
fn render_texture(
    ui: &mut egui::Ui,
    slot: &TextureSlot,
    max_width: f32,
    max_height: f32,
    placeholder: &str,
) {
    match slot.texture() {
        Some(texture) => {
            let tex_size = texture.size_vec2();
            let scale = (max_width / tex_size.x).min(max_height / tex_size.y);
            ui.image((texture.id(), tex_size * scale));
        }
        None => {
            egui::Frame::none()
                .fill(ThemeColors::BG_MEDIUM)
                .rounding(egui::Rounding::same(4.0))
                .show(ui, |ui| {
                    ui.set_min_size(egui::vec2(max_width, (max_width * 0.65).min(max_height)));
                    ui.centered_and_justified(|ui| {
                        ui.label(RichText::new(placeholder).color(ThemeColors::TEXT_MUTED));
                    });
                });
        }
    }
}
