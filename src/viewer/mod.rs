//! Viewer lifecycle management
//!
//! A viewer instance is one independent scene/camera/surface unit; the
//! registry owns all instances keyed by tab id and routes commands to the
//! addressed one only.

pub mod instance;
pub mod registry;

// Re-export main types
pub use instance::{AssemblyState, ViewerInstance};
pub use registry::ViewerRegistry;

/// Commands a viewer instance accepts once its tab exists
///
/// Assembly commands overwrite each part's animation target; there is no
/// command queue. Issuing `Explode` while an assemble is mid-flight simply
/// redirects every part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Send every part toward its assembled anchor
    Assemble,
    /// Send every part back toward its exploded anchor
    Explode,
    /// Flip between the two layouts (the toggle button's semantics)
    ToggleAssembly,
    /// Change the highlighted part, `None` clears the highlight
    Select(Option<usize>),
    /// The owning window was resized
    Resize { width: u32, height: u32 },
}
