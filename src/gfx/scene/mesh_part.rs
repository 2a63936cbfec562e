use cgmath::{Matrix4, SquareMatrix};

/// Contiguous span of vertices in the shared geometry buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexRange {
    pub first: u32,
    pub count: u32,
}

impl VertexRange {
    pub fn new(first: u32, count: u32) -> Self {
        Self { first, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn end(&self) -> u32 {
        self.first + self.count
    }

    /// Number of triangles (patches) in the range
    pub fn triangle_count(&self) -> u32 {
        self.count / 3
    }
}

/// One node of the model hierarchy
///
/// Owns its children; a node without geometry has an empty range but may
/// still carry children.
#[derive(Debug, Clone)]
pub struct MeshPart {
    pub name: String,
    /// Transform relative to the parent (column-major)
    pub transform: Matrix4<f32>,
    pub range: VertexRange,
    pub children: Vec<MeshPart>,
}

impl MeshPart {
    pub fn new(name: impl Into<String>, transform: Matrix4<f32>, range: VertexRange) -> Self {
        Self {
            name: name.into(),
            transform,
            range,
            children: Vec::new(),
        }
    }

    /// Empty identity node
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, Matrix4::identity(), VertexRange::default())
    }

    pub fn with_child(mut self, child: MeshPart) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(MeshPart::node_count).sum::<usize>()
    }
}

/// Flat per-vertex attribute arrays shared by every mesh part
///
/// Optional arrays are either empty (absent for the whole model) or hold one
/// entry per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffers {
    /// xyz per vertex
    pub positions: Vec<f32>,
    /// xyz per vertex
    pub normals: Vec<f32>,
    /// rgba per vertex
    pub colors: Vec<f32>,
    /// uv per vertex
    pub uvs: Vec<f32>,
    /// xyz per vertex
    pub tangents: Vec<f32>,
    /// xyz per vertex
    pub binormals: Vec<f32>,
}

impl GeometryBuffers {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    pub fn position(&self, vertex: usize) -> [f32; 3] {
        let p = &self.positions[vertex * 3..vertex * 3 + 3];
        [p[0], p[1], p[2]]
    }

    /// Checks every optional array against the vertex count
    ///
    /// Returns the name and length of the first array that is neither empty
    /// nor vertex-aligned.
    pub fn misaligned_attribute(&self) -> Option<(&'static str, usize)> {
        let vertices = self.vertex_count();
        [
            ("normals", self.normals.len(), 3),
            ("colors", self.colors.len(), 4),
            ("uvs", self.uvs.len(), 2),
            ("tangents", self.tangents.len(), 3),
            ("binormals", self.binormals.len(), 3),
        ]
        .into_iter()
        .find(|&(_, len, width)| len != 0 && len != vertices * width)
        .map(|(name, len, width)| (name, len / width))
    }
}
