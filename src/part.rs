//! Runtime part entity
//!
//! A `Part` is one loaded, positionable mesh unit within a viewer's
//! assembly: the renderable produced by the asset resolver plus the
//! positional state the animation driver works on.

use cgmath::Vector3;

use crate::gfx::renderable::Renderable;

/// One loaded part of an assembly
///
/// Owned exclusively by its viewer instance. `target` is `Some` exactly
/// while an animation is in flight for this part; arrival clears it.
pub struct Part {
    /// Display label from the catalog (not necessarily unique)
    pub id: String,
    /// The loaded mesh data and its GPU resources
    pub renderable: Renderable,
    /// Where the part is right now, in world units
    pub current_pos: Vector3<f32>,
    /// Exploded-layout anchor
    pub start_pos: Vector3<f32>,
    /// Assembled-layout anchor
    pub end_pos: Vector3<f32>,
    /// Position the part is animating toward, if any
    pub target: Option<Vector3<f32>>,
}

impl Part {
    /// Wraps a freshly resolved renderable as a part resting at its
    /// exploded position with no animation in flight.
    pub fn new(
        id: &str,
        renderable: Renderable,
        start_pos: Vector3<f32>,
        end_pos: Vector3<f32>,
    ) -> Self {
        Self {
            id: id.to_string(),
            renderable,
            current_pos: start_pos,
            start_pos,
            end_pos,
            target: None,
        }
    }

    /// True while this part has an animation in flight
    pub fn is_animating(&self) -> bool {
        self.target.is_some()
    }

    /// True when the part rests exactly at its assembled anchor
    pub fn is_assembled(&self) -> bool {
        self.target.is_none() && self.current_pos == self.end_pos
    }
}
