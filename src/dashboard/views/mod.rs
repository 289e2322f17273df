//! Dashboard views

pub mod camera;
pub mod controls;

pub use camera::render_camera_view;
pub use controls::{render_controls_panel, SourceInfo};
