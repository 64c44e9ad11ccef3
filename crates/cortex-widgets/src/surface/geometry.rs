//! GPU-ready mesh geometry and device limit checks

use cortex_core::data::SurfaceMesh;
use cortex_core::{Generation, Hemisphere, ResourceExhaustionError, Rgba};

/// Interleaved position + normal, vertex buffer slot 0
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Static geometry of one hemisphere, rebuilt when the mesh generation changes
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    pub generation: Generation,
    pub vertices: Vec<GpuVertex>,
    pub indices: Vec<u32>,
    pub bounds: Option<([f32; 3], [f32; 3])>,
}

impl MeshGeometry {
    pub fn from_mesh(mesh: &SurfaceMesh, generation: Generation) -> Self {
        let vertices = mesh
            .positions()
            .iter()
            .zip(mesh.normals())
            .map(|(&position, &normal)| GpuVertex { position, normal })
            .collect();
        let indices = mesh.faces().iter().flatten().copied().collect();

        Self {
            generation,
            vertices,
            indices,
            bounds: mesh.bounds(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Byte sizes of the vertex, index and colour buffers
    pub fn buffer_sizes(&self) -> [u64; 3] {
        [
            (self.vertices.len() * std::mem::size_of::<GpuVertex>()) as u64,
            (self.indices.len() * std::mem::size_of::<u32>()) as u64,
            (self.vertices.len() * std::mem::size_of::<Rgba>()) as u64,
        ]
    }
}

/// Fail if any of the hemisphere's buffers exceeds the device's buffer limit
pub fn check_buffer_limits(
    hemisphere: Hemisphere,
    geometry: &MeshGeometry,
    max_buffer_size: u64,
) -> Result<(), ResourceExhaustionError> {
    match geometry.buffer_sizes().into_iter().max() {
        Some(requested) if requested > max_buffer_size => Err(ResourceExhaustionError {
            hemisphere,
            requested,
            limit: max_buffer_size,
        }),
        _ => Ok(()),
    }
}
