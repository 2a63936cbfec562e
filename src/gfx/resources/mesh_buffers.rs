//! GPU-side vertex layout
//!
//! The tessellating vertex stage fetches whole patches from a storage
//! buffer, so the flat attribute arrays are interleaved into one vec4-padded
//! record per vertex. Missing attributes get fixed fallbacks.

use cgmath::{InnerSpace, Vector3};

use crate::{
    gfx::scene::GeometryBuffers,
    wgpu_utils::uniform_buffer::ArrayBuffer,
};

/// One patch corner as read by the shader
///
/// MUST match `PatchVertex` in the shader exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PatchVertex {
    pub position: [f32; 4],
    pub normal: [f32; 4],
    pub color: [f32; 4],
    /// uv in xy
    pub uv: [f32; 4],
    /// Zero when the model carries no tangent frame
    pub tangent: [f32; 4],
    pub binormal: [f32; 4],
}

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Interleaves the shared geometry buffers
///
/// Models without normals get the face normal of each triangle.
pub fn patch_vertices(geometry: &GeometryBuffers) -> Vec<PatchVertex> {
    let count = geometry.vertex_count();
    let vec3 = |data: &[f32], i: usize| -> [f32; 4] {
        if data.is_empty() {
            [0.0; 4]
        } else {
            [data[i * 3], data[i * 3 + 1], data[i * 3 + 2], 0.0]
        }
    };

    (0..count)
        .map(|i| {
            let normal = if geometry.has_normals() {
                vec3(&geometry.normals, i)
            } else {
                face_normal(geometry, i - i % 3)
            };
            let color = if geometry.has_colors() {
                let c = &geometry.colors[i * 4..i * 4 + 4];
                [c[0], c[1], c[2], c[3]]
            } else {
                WHITE
            };
            let uv = if geometry.has_uvs() {
                [geometry.uvs[i * 2], geometry.uvs[i * 2 + 1], 0.0, 0.0]
            } else {
                [0.0; 4]
            };
            let p = geometry.position(i);

            PatchVertex {
                position: [p[0], p[1], p[2], 1.0],
                normal,
                color,
                uv,
                tangent: vec3(&geometry.tangents, i),
                binormal: vec3(&geometry.binormals, i),
            }
        })
        .collect()
}

fn face_normal(geometry: &GeometryBuffers, first: usize) -> [f32; 4] {
    if first + 2 >= geometry.vertex_count() {
        return [0.0, 0.0, 1.0, 0.0];
    }
    let a = Vector3::from(geometry.position(first));
    let b = Vector3::from(geometry.position(first + 1));
    let c = Vector3::from(geometry.position(first + 2));
    let n = (b - a).cross(c - a);
    if n.magnitude2() > 0.0 {
        n.normalize().extend(0.0).into()
    } else {
        [0.0, 0.0, 1.0, 0.0]
    }
}

/// Storage buffer holding every patch vertex of the model
pub type PatchBuffer = ArrayBuffer<PatchVertex>;

pub fn create_patch_buffer(device: &wgpu::Device, geometry: &GeometryBuffers) -> PatchBuffer {
    PatchBuffer::new_with_data(
        device,
        &patch_vertices(geometry),
        wgpu::BufferUsages::STORAGE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> GeometryBuffers {
        GeometryBuffers {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_layout_size() {
        assert_eq!(std::mem::size_of::<PatchVertex>(), 96);
    }

    #[test]
    fn test_missing_attributes_get_fallbacks() {
        let vertices = patch_vertices(&triangle());
        assert_eq!(vertices.len(), 3);
        for v in &vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0, 0.0]);
            assert_eq!(v.color, WHITE);
            assert_eq!(v.uv, [0.0; 4]);
            assert_eq!(v.tangent, [0.0; 4]);
        }
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_present_attributes_are_interleaved() {
        let mut geometry = triangle();
        geometry.normals = vec![0.0, 1.0, 0.0].repeat(3);
        geometry.uvs = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        geometry.colors = vec![0.5, 0.25, 0.125, 1.0].repeat(3);

        let vertices = patch_vertices(&geometry);
        assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(vertices[2].uv, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(vertices[1].color, [0.5, 0.25, 0.125, 1.0]);
    }
}
