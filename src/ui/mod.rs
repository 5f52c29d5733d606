//! Per-tab overlay UI
//!
//! ImGui integration for the viewer overlays (assemble button, load
//! progress, part list). Each viewer instance owns its own manager bound
//! to its own window.

pub mod manager;

pub use manager::UiManager;
