//! # Graphics Module
//!
//! Graphics functionality for the Gasket viewer: camera system, per-viewer
//! scenes, renderable mesh units, materials, and the wgpu forward renderer.
//!
//! Each viewer instance owns its own `Scene` and `RenderEngine`; nothing in
//! this module is shared across instances.

pub mod camera;
pub mod material;
pub mod renderable;
pub mod rendering;
pub mod scene;
pub mod vertex;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
pub use scene::Scene;
