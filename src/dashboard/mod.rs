//! Dashboard UI Module
//!
//! The interactive scanner window: live camera view with the detected
//! document outline, threshold trackbars, the optional stage grid and the
//! last scan report.

pub mod app;
pub mod components;
pub mod state;
pub mod theme;
pub mod views;

pub use app::{run_dashboard, ScannerApp};
pub use state::DashboardState;
