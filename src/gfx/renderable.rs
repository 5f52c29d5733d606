//! Renderable mesh units
//!
//! A `Renderable` wraps the mesh geometry loaded for one part, its world
//! transform, and lazily created GPU resources. Mesh data arrives from the
//! asset layer as plain arrays and is uploaded once a device exists, so
//! renderables can be built and tested without a GPU.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use wgpu::Device;

use super::material::MaterialId;
use super::vertex::Vertex3D;

/// Raw mesh arrays as produced by a mesh source
///
/// Positions and normals are flat `xyz` triplets. Normals may be empty;
/// [`Mesh::from_data`] derives face normals in that case.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

/// One mesh sub-node of a renderable
pub struct Mesh {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    /// Material applied by the asset resolver; `None` draws the default
    pub material_id: Option<MaterialId>,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,
}

impl Mesh {
    /// Builds a mesh from raw arrays, deriving smooth face normals when the
    /// source data carries none (or a mismatched count).
    pub fn from_data(data: MeshData) -> Self {
        let normals = if !data.normals.is_empty() && data.normals.len() == data.positions.len() {
            data.normals
        } else {
            calculate_face_normals(&data.positions, &data.indices)
        };

        let mut vertices = Vec::with_capacity(data.positions.len() / 3);
        for i in 0..data.positions.len() / 3 {
            vertices.push(Vertex3D {
                position: [
                    data.positions[i * 3],
                    data.positions[i * 3 + 1],
                    data.positions[i * 3 + 2],
                ],
                normal: [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
            });
        }

        let index_count = data.indices.len() as u32;
        Self {
            vertices,
            indices: data.indices,
            material_id: None,
            vertex_buffer: None,
            index_buffer: None,
            index_count,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }

    fn init_gpu_buffers(&mut self, device: &Device) {
        let vertex_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Part Vertex Buffer"),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );

        let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Part Index Buffer"),
                contents: bytemuck::cast_slice(&self.indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        );

        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
    }
}

/// Averages face normals onto vertices for OBJ files that ship without
/// normal data.
fn calculate_face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut normals = vec![0.0; positions.len()];
    let mut counts = vec![0u32; vertex_count];

    for triangle in indices.chunks(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];

        let v0 = Vector3::new(positions[i0 * 3], positions[i0 * 3 + 1], positions[i0 * 3 + 2]);
        let v1 = Vector3::new(positions[i1 * 3], positions[i1 * 3 + 1], positions[i1 * 3 + 2]);
        let v2 = Vector3::new(positions[i2 * 3], positions[i2 * 3 + 1], positions[i2 * 3 + 2]);

        let face_normal = (v1 - v0).cross(v2 - v0);

        for &vertex_idx in &[i0, i1, i2] {
            normals[vertex_idx * 3] += face_normal.x;
            normals[vertex_idx * 3 + 1] += face_normal.y;
            normals[vertex_idx * 3 + 2] += face_normal.z;
            counts[vertex_idx] += 1;
        }
    }

    for i in 0..vertex_count {
        if counts[i] == 0 {
            continue;
        }
        let mut n = Vector3::new(normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]);
        n /= counts[i] as f32;

        let length = (n.x * n.x + n.y * n.y + n.z * n.z).sqrt();
        if length > 0.0 {
            n /= length;
        }
        normals[i * 3] = n.x;
        normals[i * 3 + 1] = n.y;
        normals[i * 3 + 2] = n.z;
    }

    normals
}

/// Per-renderable GPU state: the transform uniform and its bind group
pub struct RenderableGpu {
    pub transform_buffer: wgpu::Buffer,
    pub transform_bind_group: wgpu::BindGroup,
}

/// A loaded, positionable mesh unit
///
/// GPU resources stay `None` until [`Renderable::init_gpu_resources`] runs;
/// drawing skips anything not yet uploaded, so a renderable that never
/// touches a device is still a fully usable value.
pub struct Renderable {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub transform: Matrix4<f32>,
    pub visible: bool,
    pub gpu: Option<RenderableGpu>,
}

impl Renderable {
    pub fn new(name: &str, meshes: Vec<Mesh>) -> Self {
        Self {
            name: name.to_string(),
            meshes,
            transform: Matrix4::identity(),
            visible: true,
            gpu: None,
        }
    }

    /// Runs an action over every mesh sub-node.
    ///
    /// This is how cross-cutting per-mesh assignments are expressed (the
    /// asset resolver stamps material ids through it).
    pub fn visit_meshes(&mut self, mut action: impl FnMut(&mut Mesh)) {
        for mesh in &mut self.meshes {
            action(mesh);
        }
    }

    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.transform = Matrix4::from_translation(translation);
    }

    /// Writes the current transform into the GPU uniform, if uploaded.
    pub fn update_transform(&mut self, queue: &wgpu::Queue) {
        if let Some(gpu) = &self.gpu {
            let transform_data: &[f32; 16] = self.transform.as_ref();
            queue.write_buffer(
                &gpu.transform_buffer,
                0,
                bytemuck::cast_slice(transform_data),
            );
        }
    }

    pub fn transform_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu.as_ref().map(|gpu| &gpu.transform_bind_group)
    }

    /// Layout of the per-renderable transform uniform (bind group 1).
    ///
    /// The render engine builds the same layout for pipeline creation;
    /// keeping the definition in one place keeps them compatible.
    pub fn transform_bind_group_layout(device: &Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Transform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    /// Uploads mesh buffers and the transform uniform.
    pub fn init_gpu_resources(&mut self, device: &Device) {
        for mesh in &mut self.meshes {
            mesh.init_gpu_buffers(device);
        }

        let transform_data: &[f32; 16] = self.transform.as_ref();
        let transform_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Transform Uniform Buffer"),
                contents: bytemuck::cast_slice(transform_data),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        let layout = Self::transform_bind_group_layout(device);
        let transform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Transform Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transform_buffer.as_entire_binding(),
            }],
        });

        self.gpu = Some(RenderableGpu {
            transform_buffer,
            transform_bind_group,
        });
    }
}

/// Mesh drawing extension for render passes
pub trait DrawMesh<'a> {
    fn draw_mesh(&mut self, mesh: &'a Mesh);
}

impl<'a, 'b> DrawMesh<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, mesh: &'b Mesh) {
        let Some(vertex_buffer) = &mesh.vertex_buffer else {
            return; // not uploaded yet
        };
        let Some(index_buffer) = &mesh.index_buffer else {
            return;
        };

        self.set_vertex_buffer(0, vertex_buffer.slice(..));
        self.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_data(normals: Vec<f32>) -> MeshData {
        MeshData {
            name: "quad".to_string(),
            positions: vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0,
            ],
            normals,
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn test_missing_normals_are_derived() {
        let mesh = Mesh::from_data(quad_data(Vec::new()));
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);

        // A flat quad in the XY plane gets +Z normals everywhere.
        for vertex in &mesh.vertices {
            assert!((vertex.normal[2] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_provided_normals_are_kept() {
        let normals = vec![
            1.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 0.0, 0.0,
        ];
        let mesh = Mesh::from_data(quad_data(normals));
        for vertex in &mesh.vertices {
            assert_eq!(vertex.normal, [1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_visit_meshes_reaches_every_sub_node() {
        let meshes = vec![
            Mesh::from_data(quad_data(Vec::new())),
            Mesh::from_data(quad_data(Vec::new())),
        ];
        let mut renderable = Renderable::new("pair", meshes);

        renderable.visit_meshes(|mesh| mesh.material_id = Some("matChrome".to_string()));

        assert!(renderable
            .meshes
            .iter()
            .all(|mesh| mesh.material_id.as_deref() == Some("matChrome")));
    }
}
