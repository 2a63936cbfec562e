use std::ops::Range;

use crate::gfx::scene::{DrawTarget, NodeTransforms, NodeUniforms, VertexRange};

/// One draw: the uniform slot to bind and the vertices to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    pub slot: usize,
    pub range: VertexRange,
}

impl DrawCommand {
    /// Patch (instance) indices covered by the draw
    pub fn patches(&self) -> Range<u32> {
        self.range.first / 3..self.range.end() / 3
    }
}

/// Collects a frame's traversal into uniform slots and draw commands
///
/// The uniforms are uploaded in one write before the render pass; each draw
/// then selects its slot by dynamic offset.
#[derive(Debug, Default)]
pub struct FrameBatch {
    pub uniforms: Vec<NodeUniforms>,
    pub draws: Vec<DrawCommand>,
}

impl FrameBatch {
    pub fn clear(&mut self) {
        self.uniforms.clear();
        self.draws.clear();
    }
}

impl DrawTarget for FrameBatch {
    fn upload_node(&mut self, transforms: &NodeTransforms) {
        self.uniforms.push(transforms.to_uniforms());
    }

    fn draw_range(&mut self, range: VertexRange) {
        self.draws.push(DrawCommand {
            slot: self.uniforms.len().saturating_sub(1),
            range,
        });
    }
}
