// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Owns the wgpu surface and the forward render pass that draws a scene's
//! parts each frame.

pub mod render_engine;

// Re-export main types
pub use render_engine::{LightConfig, RenderEngine};
