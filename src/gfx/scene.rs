//! Per-viewer scene state
//!
//! Each viewer instance owns exactly one scene: its resolved parts, its
//! material library, its camera, and the idle rotation of the assembly
//! group. Nothing here is shared between viewers.

use cgmath::{Matrix4, Rad, Vector3};

use crate::part::Part;

use super::camera::camera_utils::CameraManager;
use super::material::MaterialLibrary;

/// One viewer's scene: parts, materials, camera, and group orientation
pub struct Scene {
    pub camera_manager: CameraManager,
    pub parts: Vec<Part>,
    pub materials: MaterialLibrary,
    /// Idle rotation of the whole assembly around Y, in radians
    pub group_angle: f32,
}

impl Scene {
    /// Creates an empty scene with the standard material palette.
    pub fn new(camera_manager: CameraManager) -> Self {
        Self {
            camera_manager,
            parts: Vec::new(),
            materials: MaterialLibrary::new(),
            group_angle: 0.0,
        }
    }

    /// Updates camera matrices; call once per frame before rendering.
    pub fn update(&mut self) {
        self.camera_manager.camera.update_view_proj();
    }

    /// Installs the resolved parts for this scene.
    pub fn set_parts(&mut self, parts: Vec<Part>) {
        self.parts = parts;
    }

    /// Uploads GPU resources for every part and material.
    ///
    /// Must be called after a device exists and again whenever new parts
    /// arrive; already-uploaded materials are refreshed, not duplicated.
    pub fn init_gpu_resources(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        for part in &mut self.parts {
            part.renderable.init_gpu_resources(device);
        }
        self.materials.update_all_gpu_resources(device, queue);
    }

    /// Recomputes each part's world transform from the group rotation and
    /// the part's animated position, then syncs the GPU uniforms.
    ///
    /// Parts are positioned inside the rotating group, so the group angle
    /// spins the already-translated part around the scene origin.
    pub fn sync_transforms(&mut self, queue: &wgpu::Queue) {
        let group = Matrix4::from_angle_y(Rad(self.group_angle));
        for part in &mut self.parts {
            part.renderable.transform = group * Matrix4::from_translation(part.current_pos);
            part.renderable.update_transform(queue);
        }
    }

    /// Centroid of the current part positions, used for camera framing.
    pub fn parts_center(&self) -> Vector3<f32> {
        if self.parts.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        let sum = self
            .parts
            .iter()
            .fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + p.current_pos);
        sum / self.parts.len() as f32
    }

    /// First part carrying the given label.
    ///
    /// Labels are not unique (paired parts share one), so this is strictly
    /// first-match and only suitable for display lookups.
    pub fn find_part(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.id == id)
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
    use crate::gfx::renderable::Renderable;

    fn headless_scene() -> Scene {
        let camera = OrbitCamera::framing_assembly(1.0);
        let controller = CameraController::new(0.005, 0.1);
        Scene::new(CameraManager::new(camera, controller))
    }

    fn part(id: &str, y: f32) -> Part {
        Part::new(
            id,
            Renderable::new(id, Vec::new()),
            Vector3::new(0.0, y, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
        )
    }

    #[test]
    fn test_find_part_is_first_match() {
        let mut scene = headless_scene();
        scene.set_parts(vec![part("flange", 7.0), part("flange", 12.0)]);

        let found = scene.find_part("flange").unwrap();
        assert_eq!(found.start_pos.y, 7.0);
    }

    #[test]
    fn test_parts_center_averages_positions() {
        let mut scene = headless_scene();
        scene.set_parts(vec![part("a", 10.0), part("b", -10.0)]);

        assert_eq!(scene.parts_center(), Vector3::new(0.0, 0.0, 0.0));
    }
}
