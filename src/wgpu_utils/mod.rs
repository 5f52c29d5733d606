// src/wgpu_utils/mod.rs
//! WGPU utility helpers
//!
//! Small wrappers for common wgpu buffer operations.

pub mod uniform_buffer;

// Re-export main types
pub use uniform_buffer::UniformBuffer;
