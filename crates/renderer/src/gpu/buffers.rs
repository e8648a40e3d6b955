use bytemuck::{Pod, Zeroable};
use gallery::{InstanceStore, PlaneMesh};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct GpuVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
const ANGLE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32];
const HEIGHT_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32];
const TILE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![4 => Float32];

impl GpuVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        }
    }
}

/// Angle, height and tile index, one tightly packed `f32` stream each.
pub(crate) fn instance_attribute_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
    [&ANGLE_ATTRIBUTES, &HEIGHT_ATTRIBUTES, &TILE_ATTRIBUTES].map(|attributes| {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<f32>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes,
        }
    })
}

/// The card plane, with a triangle index list and a line index list.
pub(crate) struct MeshBuffers {
    pub vertices: wgpu::Buffer,
    pub triangles: wgpu::Buffer,
    pub triangle_count: u32,
    pub lines: wgpu::Buffer,
    pub line_count: u32,
}

impl MeshBuffers {
    pub fn new(device: &wgpu::Device, mesh: &PlaneMesh) -> Self {
        let vertices: Vec<GpuVertex> = mesh
            .vertices
            .iter()
            .map(|vertex| GpuVertex {
                position: vertex.position,
                uv: vertex.uv,
            })
            .collect();
        let wire = mesh.wire_indices();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("card vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let triangles = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("card triangles"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let lines = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("card wireframe"),
            contents: bytemuck::cast_slice(&wire),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertices: vertex_buffer,
            triangles,
            triangle_count: mesh.indices.len() as u32,
            lines,
            line_count: wire.len() as u32,
        }
    }
}

/// GPU copies of the instance attribute arrays. The slot count is fixed at
/// creation; uploads happen only when the store reports itself dirty.
pub(crate) struct InstanceBuffers {
    pub angles: wgpu::Buffer,
    pub heights: wgpu::Buffer,
    pub tiles: wgpu::Buffer,
    pub count: u32,
}

impl InstanceBuffers {
    pub fn new(device: &wgpu::Device, store: &InstanceStore) -> Self {
        let create = |label: &str, data: &[f32]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
        };
        Self {
            angles: create("instance angles", store.angles()),
            heights: create("instance heights", store.heights()),
            tiles: create("instance tiles", store.texture_indices()),
            count: store.len() as u32,
        }
    }

    /// Returns whether anything was written.
    pub fn sync(&self, queue: &wgpu::Queue, store: &mut InstanceStore) -> bool {
        if !store.take_dirty() {
            return false;
        }
        queue.write_buffer(&self.angles, 0, bytemuck::cast_slice(store.angles()));
        queue.write_buffer(&self.heights, 0, bytemuck::cast_slice(store.heights()));
        queue.write_buffer(&self.tiles, 0, bytemuck::cast_slice(store.texture_indices()));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_shader_inputs() {
        let layout = GpuVertex::layout();
        assert_eq!(layout.array_stride, 16);
        assert_eq!(layout.attributes[0].shader_location, 0);
        assert_eq!(layout.attributes[1].shader_location, 1);
        assert_eq!(layout.attributes[1].offset, 8);
    }

    #[test]
    fn instance_streams_use_locations_two_to_four() {
        let layouts = instance_attribute_layouts();
        let locations: Vec<u32> = layouts
            .iter()
            .map(|layout| layout.attributes[0].shader_location)
            .collect();
        assert_eq!(locations, [2, 3, 4]);
        assert!(layouts
            .iter()
            .all(|layout| layout.step_mode == wgpu::VertexStepMode::Instance && layout.array_stride == 4));
    }
}
