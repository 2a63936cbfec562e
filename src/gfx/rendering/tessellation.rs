//! Vertex-stage tessellation templates
//!
//! wgpu has no tessellation stages, so subdivision is done with instancing:
//! for every level `n` a template of `n * n` sub-triangles is precomputed as
//! barycentric coordinates. A draw renders the template once per patch and
//! the vertex shader evaluates the patch surface at each barycentric point.

use std::ops::Range;

/// Barycentric weights for the three patch corners
pub type Barycentric = [f32; 3];

/// All templates for levels `min_level..=max_level` in one vertex array
#[derive(Debug, Clone)]
pub struct TessellationTemplates {
    vertices: Vec<Barycentric>,
    ranges: Vec<Range<u32>>,
    min_level: u32,
}

impl TessellationTemplates {
    pub fn new(min_level: u32, max_level: u32) -> Self {
        let min_level = min_level.max(1);
        let max_level = max_level.max(min_level);

        let mut vertices = Vec::new();
        let mut ranges = Vec::new();
        for level in min_level..=max_level {
            let start = vertices.len() as u32;
            vertices.extend(subdivide(level));
            ranges.push(start..vertices.len() as u32);
        }

        Self {
            vertices,
            ranges,
            min_level,
        }
    }

    pub fn vertices(&self) -> &[Barycentric] {
        &self.vertices
    }

    pub fn level_range(&self) -> (u32, u32) {
        (self.min_level, self.min_level + self.ranges.len() as u32 - 1)
    }

    /// Template vertex range for `level`, clamped to the available levels
    pub fn range(&self, level: u32) -> Range<u32> {
        let (min, max) = self.level_range();
        let index = (level.clamp(min, max) - min) as usize;
        self.ranges[index].clone()
    }
}

/// Splits one triangle into `level * level` sub-triangles
///
/// Grid point `(i, j)` has weight `i / level` on corner 1 and `j / level` on
/// corner 2. Winding matches the patch.
pub fn subdivide(level: u32) -> Vec<Barycentric> {
    let n = level.max(1);
    let point = |i: u32, j: u32| -> Barycentric {
        let f = n as f32;
        [(n - i - j) as f32 / f, i as f32 / f, j as f32 / f]
    };

    let mut vertices = Vec::with_capacity((n * n * 3) as usize);
    for j in 0..n {
        for i in 0..n - j {
            vertices.extend([point(i, j), point(i + 1, j), point(i, j + 1)]);
            if i + j + 2 <= n {
                vertices.extend([point(i + 1, j), point(i + 1, j + 1), point(i, j + 1)]);
            }
        }
    }
    vertices
}

/// Vertex buffer layout for the template: one barycentric per vertex
pub fn template_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Barycentric>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}
