// src/lib.rs
//! Gasket
//!
//! An interactive 3D exploded-assembly viewer built on wgpu and winit.
//! Loads a catalog of OBJ parts per viewer tab, lays them out exploded,
//! and animates them into the assembled layout (and back) on command.

pub mod animation;
pub mod app;
pub mod assets;
pub mod catalog;
pub mod gfx;
pub mod part;
pub mod prelude;
pub mod ui;
pub mod viewer;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::GasketApp;

/// Creates a default Gasket application instance
pub fn default() -> GasketApp {
    GasketApp::new()
}
