//! Material system for the forward renderer
//!
//! Materials are stored centrally in a [`MaterialLibrary`] and referenced by
//! id from mesh sub-nodes. Catalog material keys resolve against the library
//! with a guaranteed fallback: an unknown key yields the default material,
//! never an error. The library ships the viewer's standard palette.

use std::collections::HashMap;
use wgpu::Device;

use crate::wgpu_utils::uniform_buffer::UniformBuffer;

/// Material id used by mesh sub-nodes to reference library entries
pub type MaterialId = String;

/// GPU uniform data for materials
///
/// Field order and padding must match the `MaterialUniform` struct in
/// `forward.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub normal_scale: f32,
    pub occlusion_strength: f32,
    pub emissive: [f32; 3],
    _padding: f32,
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Material definition with basic PBR properties
///
/// GPU resources are shared by all meshes using this material and created
/// lazily once a device is available.
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],

    material_ubo: Option<MaterialUBO>,
    bind_group: Option<wgpu::BindGroup>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: MaterialLibrary::DEFAULT_ID.to_string(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            emissive: [0.0, 0.0, 0.0],
            material_ubo: None,
            bind_group: None,
        }
    }
}

impl Material {
    /// Creates a material with the given color, metallic and roughness
    /// factors (both clamped to [0, 1]).
    pub fn new(name: &str, base_color: [f32; 4], metallic: f32, roughness: f32) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            metallic: metallic.clamp(0.0, 1.0),
            roughness: roughness.clamp(0.0, 1.0),
            emissive: [0.0, 0.0, 0.0],
            material_ubo: None,
            bind_group: None,
        }
    }

    /// Builder pattern: set emissive color (used for selection glow)
    pub fn with_emission(mut self, r: f32, g: f32, b: f32) -> Self {
        self.emissive = [r, g, b];
        self
    }

    /// Layout of the per-material uniform (bind group 2).
    pub fn bind_group_layout(device: &Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    /// Creates or refreshes this material's GPU resources.
    pub fn update_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        if self.material_ubo.is_none() {
            self.material_ubo = Some(MaterialUBO::new(device));
        }

        if self.bind_group.is_none() {
            let layout = Self::bind_group_layout(device);
            self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material Bind Group"),
                layout: &layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.material_ubo.as_ref().unwrap().binding_resource(),
                }],
            }));
        }

        let uniform_data = MaterialUniform {
            base_color: self.base_color,
            metallic: self.metallic,
            roughness: self.roughness,
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            emissive: self.emissive,
            _padding: 0.0,
        };

        if let Some(ubo) = &mut self.material_ubo {
            ubo.update_content(queue, uniform_data);
        }
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

/// Central material storage with default fallback
///
/// Every library contains the default material plus the standard palette
/// the demo catalogs reference. Lookup never fails; unknown ids resolve to
/// the default.
pub struct MaterialLibrary {
    materials: HashMap<MaterialId, Material>,
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialLibrary {
    /// Id of the fallback material present in every library
    pub const DEFAULT_ID: &'static str = "default";

    pub fn new() -> Self {
        let mut library = Self {
            materials: HashMap::new(),
        };

        library.add(Material::default());
        library.install_palette();
        library
    }

    /// The standard palette: hardware finishes plus the flat accent colors
    /// the demo catalogs use.
    fn install_palette(&mut self) {
        self.add(Material::new(
            "hardwareMetallic",
            [0.50, 0.50, 0.50, 1.0],
            0.9,
            0.2,
        ));
        self.add(Material::new("matMetallic", [0.63, 0.63, 0.67, 1.0], 0.9, 0.2));
        self.add(Material::new("matChrome", [1.0, 1.0, 1.0, 1.0], 1.0, 0.0));
        self.add(Material::new("matRed", [0.86, 0.15, 0.15, 1.0], 0.1, 1.0));
        self.add(Material::new("matGreen", [0.09, 0.64, 0.29, 1.0], 0.1, 1.0));
        self.add(Material::new("matBlue", [0.15, 0.39, 0.92, 1.0], 0.3, 1.0));
        self.add(Material::new("matBlueO", [0.0, 0.28, 0.67, 1.0], 0.1, 0.4));
        self.add(Material::new("matYellow", [0.92, 0.70, 0.03, 1.0], 0.1, 1.0));
        self.add(Material::new("matOrange", [0.92, 0.35, 0.05, 1.0], 0.1, 1.0));
        self.add(Material::new("matPurple", [0.58, 0.20, 0.92, 1.0], 0.0, 1.0));
        self.add(Material::new("matWhite", [0.96, 0.96, 0.96, 1.0], 0.1, 1.0));
        self.add(Material::new("matBlack", [0.20, 0.20, 0.20, 1.0], 0.1, 1.0));
    }

    pub fn add(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn get(&self, id: &str) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn default_material(&self) -> &Material {
        self.materials
            .get(Self::DEFAULT_ID)
            .expect("default material is installed at construction")
    }

    /// Resolves a catalog material key to an id present in the library.
    ///
    /// Unknown keys fall back to the default material id. This is the only
    /// place the fallback decision is made; render-time lookups then always
    /// hit an existing entry.
    pub fn resolve_key(&self, key: &str) -> MaterialId {
        if self.materials.contains_key(key) {
            key.to_string()
        } else {
            log::debug!("material key '{key}' not in library, using default");
            Self::DEFAULT_ID.to_string()
        }
    }

    /// Material lookup for rendering, falling back to the default when the
    /// mesh carries no id or a stale one.
    pub fn material_for(&self, id: Option<&MaterialId>) -> &Material {
        match id {
            Some(id) => self.get(id).unwrap_or_else(|| self.default_material()),
            None => self.default_material(),
        }
    }

    pub fn ids(&self) -> Vec<&MaterialId> {
        self.materials.keys().collect()
    }

    /// Creates or refreshes GPU resources for every material.
    pub fn update_all_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        for material in self.materials.values_mut() {
            material.update_gpu_resources(device, queue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_always_has_default() {
        let library = MaterialLibrary::new();
        assert_eq!(library.default_material().name, MaterialLibrary::DEFAULT_ID);
    }

    #[test]
    fn test_unknown_key_resolves_to_default() {
        let library = MaterialLibrary::new();
        assert_eq!(library.resolve_key("matNope"), MaterialLibrary::DEFAULT_ID);
        assert_eq!(library.resolve_key("matChrome"), "matChrome");
    }

    #[test]
    fn test_material_for_falls_back() {
        let library = MaterialLibrary::new();
        let stale = "gone".to_string();

        assert_eq!(library.material_for(None).name, MaterialLibrary::DEFAULT_ID);
        assert_eq!(
            library.material_for(Some(&stale)).name,
            MaterialLibrary::DEFAULT_ID
        );

        let chrome = "matChrome".to_string();
        assert_eq!(library.material_for(Some(&chrome)).name, "matChrome");
    }

    #[test]
    fn test_palette_covers_demo_catalog_keys() {
        let library = MaterialLibrary::new();
        for def in crate::catalog::PartCatalog::flange_demo().definitions {
            assert_eq!(library.resolve_key(&def.material_key), def.material_key);
        }
    }
}
