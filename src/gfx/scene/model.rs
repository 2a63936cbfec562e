use std::path::Path;

use cgmath::{Matrix4, Point3, Transform, Vector2, Vector3};
use log::{debug, info};

use crate::error::{Result, ViewerError};

use super::{
    import::{import_scene, row_major_to_matrix, ImportedMesh, SceneGraph, SceneNode},
    mesh_part::{GeometryBuffers, MeshPart, VertexRange},
    tangents::face_tangents,
};

/// Axis-aligned bounding box in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn include(&mut self, p: Point3<f32>) {
        self.min = Vector3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vector3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Vector3<f32> {
        self.min + self.extent() * 0.5
    }
}

/// A loaded, normalised model: hierarchy plus shared geometry
#[derive(Debug, Clone)]
pub struct Model {
    pub root: MeshPart,
    pub geometry: GeometryBuffers,
    /// Bounding box before normalisation
    pub bounds: BoundingBox,
}

/// Which optional attributes the meshes seen so far carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attributes {
    normals: bool,
    colors: bool,
    uvs: bool,
    tangents: bool,
}

impl Attributes {
    fn of(mesh: &ImportedMesh) -> Self {
        let normals = mesh.normals.is_some();
        let uvs = mesh.uvs.is_some();
        Self {
            normals,
            colors: mesh.colors.is_some(),
            uvs,
            tangents: normals && uvs,
        }
    }
}

struct Builder<'a> {
    graph: &'a SceneGraph,
    invert: bool,
    geometry: GeometryBuffers,
    attributes: Option<Attributes>,
}

impl Model {
    /// Imports a model file and builds the normalised hierarchy
    pub fn load(path: impl AsRef<Path>, invert: bool) -> Result<Self> {
        let path = path.as_ref();
        let graph = import_scene(path)?;
        let model = Self::from_scene(&graph, invert)?;
        info!(
            "Loaded {}: {} parts, {} vertices",
            path.display(),
            model.root.node_count(),
            model.geometry.vertex_count()
        );
        Ok(model)
    }

    /// Builds the hierarchy from an imported scene
    ///
    /// The root transform absorbs a recentre and a uniform rescale so the
    /// largest extent of the model becomes 1. `invert` negates the scale and
    /// every normal, turning the model inside out.
    pub fn from_scene(graph: &SceneGraph, invert: bool) -> Result<Self> {
        let bounds = scene_bounds(graph)?;

        let mut builder = Builder {
            graph,
            invert,
            geometry: GeometryBuffers::default(),
            attributes: None,
        };
        let mut root = builder.part(&graph.root)?;
        let geometry = builder.geometry;

        if let Some((name, count)) = geometry.misaligned_attribute() {
            return Err(ViewerError::GeometryMismatch(format!(
                "{} {} for {} vertices",
                count,
                name,
                geometry.vertex_count()
            )));
        }

        root.transform = normalization(&bounds, invert)? * root.transform;

        debug!(
            "Model bounds {:?}..{:?}, normals: {}, colors: {}, uvs: {}, tangents: {}",
            bounds.min,
            bounds.max,
            geometry.has_normals(),
            geometry.has_colors(),
            geometry.has_uvs(),
            geometry.has_tangents()
        );

        Ok(Self {
            root,
            geometry,
            bounds,
        })
    }

    pub fn vertex_count(&self) -> u32 {
        self.geometry.vertex_count() as u32
    }
}

/// World-space bounding box of every vertex in the scene
pub fn scene_bounds(graph: &SceneGraph) -> Result<BoundingBox> {
    let mut bounds = BoundingBox::empty();
    let mut stack: Vec<(&SceneNode, Matrix4<f32>)> =
        vec![(&graph.root, row_major_to_matrix(&graph.root.transform))];

    while let Some((node, world)) = stack.pop() {
        for &mesh in &node.meshes {
            let mesh = mesh_at(graph, mesh)?;
            for &p in &mesh.positions {
                bounds.include(world.transform_point(Point3::from(p)));
            }
        }
        for child in &node.children {
            stack.push((child, world * row_major_to_matrix(&child.transform)));
        }
    }

    if bounds.is_empty() {
        return Err(ViewerError::GeometryMismatch(
            "model contains no vertices".to_string(),
        ));
    }
    Ok(bounds)
}

/// Recentre-and-rescale transform applied on top of the root transform
pub fn normalization(bounds: &BoundingBox, invert: bool) -> Result<Matrix4<f32>> {
    let extent = bounds.extent();
    let degenerate = |e: f32| e <= 0.0 || !e.is_finite();
    if degenerate(extent.x) || degenerate(extent.y) || degenerate(extent.z) {
        return Err(ViewerError::GeometryMismatch(format!(
            "bounding box has zero extent ({:?})",
            extent
        )));
    }

    let max_extent = extent.x.max(extent.y).max(extent.z);
    let scale = if invert { -1.0 / max_extent } else { 1.0 / max_extent };
    debug!("Normalising by scale {} around {:?}", scale, bounds.center());

    Ok(Matrix4::from_scale(scale) * Matrix4::from_translation(-bounds.center()))
}

fn mesh_at(graph: &SceneGraph, index: usize) -> Result<&ImportedMesh> {
    graph.meshes.get(index).ok_or_else(|| {
        ViewerError::GeometryMismatch(format!(
            "node refers to mesh {} but the scene has {}",
            index,
            graph.meshes.len()
        ))
    })
}

impl Builder<'_> {
    fn part(&mut self, node: &SceneNode) -> Result<MeshPart> {
        let first = self.geometry.vertex_count() as u32;
        for &index in &node.meshes {
            let mesh = mesh_at(self.graph, index)?;
            self.append_mesh(index, mesh)?;
        }
        let count = self.geometry.vertex_count() as u32 - first;

        let mut part = MeshPart::new(
            node.name.clone(),
            row_major_to_matrix(&node.transform),
            VertexRange::new(first, count),
        );
        for child in &node.children {
            part.children.push(self.part(child)?);
        }
        Ok(part)
    }

    fn append_mesh(&mut self, index: usize, mesh: &ImportedMesh) -> Result<()> {
        check_lengths(index, mesh)?;

        let attributes = Attributes::of(mesh);
        let seen = *self.attributes.get_or_insert(attributes);
        if seen != attributes {
            return Err(ViewerError::GeometryMismatch(format!(
                "mesh {} has attributes {:?}, earlier meshes have {:?}",
                index, attributes, seen
            )));
        }

        let vertex_count = mesh.positions.len();
        for (face_index, face) in mesh.faces.iter().enumerate() {
            if face.len() != 3 {
                return Err(ViewerError::UnsupportedTopology {
                    mesh: index,
                    face: face_index,
                    arity: face.len(),
                });
            }
            let mut corners = [0usize; 3];
            for (corner, &vertex) in corners.iter_mut().zip(face) {
                let vertex = vertex as usize;
                if vertex >= vertex_count {
                    return Err(ViewerError::GeometryMismatch(format!(
                        "mesh {} face {} refers to vertex {} of {}",
                        index, face_index, vertex, vertex_count
                    )));
                }
                *corner = vertex;
            }
            self.append_face(mesh, corners, attributes);
        }
        Ok(())
    }

    fn append_face(&mut self, mesh: &ImportedMesh, corners: [usize; 3], attributes: Attributes) {
        let sign = if self.invert { -1.0 } else { 1.0 };
        let geometry = &mut self.geometry;

        for &v in &corners {
            geometry.positions.extend_from_slice(&mesh.positions[v]);
            if let Some(normals) = &mesh.normals {
                geometry.normals.extend(normals[v].iter().map(|n| n * sign));
            }
            if let Some(colors) = &mesh.colors {
                geometry.colors.extend_from_slice(&colors[v]);
            }
            if let Some(uvs) = &mesh.uvs {
                geometry.uvs.extend_from_slice(&uvs[v]);
            }
        }

        if !attributes.tangents {
            return;
        }

        if let (Some(tangents), Some(bitangents)) = (&mesh.tangents, &mesh.bitangents) {
            for &v in &corners {
                geometry.tangents.extend_from_slice(&tangents[v]);
                geometry.binormals.extend_from_slice(&bitangents[v]);
            }
            return;
        }

        // attributes.tangents implies both are present
        let (Some(normals), Some(uvs)) = (&mesh.normals, &mesh.uvs) else {
            return;
        };
        let frame = face_tangents(
            corners.map(|v| Vector3::from(mesh.positions[v])),
            corners.map(|v| Vector3::from(normals[v]) * sign),
            corners.map(|v| Vector2::from(uvs[v])),
        );
        for corner in 0..3 {
            let t: [f32; 3] = frame.tangents[corner].into();
            let b: [f32; 3] = frame.binormals[corner].into();
            geometry.tangents.extend_from_slice(&t);
            geometry.binormals.extend_from_slice(&b);
        }
    }
}

fn check_lengths(index: usize, mesh: &ImportedMesh) -> Result<()> {
    let expected = mesh.positions.len();
    let lengths = [
        ("normals", mesh.normals.as_ref().map(Vec::len)),
        ("colors", mesh.colors.as_ref().map(Vec::len)),
        ("uvs", mesh.uvs.as_ref().map(Vec::len)),
        ("tangents", mesh.tangents.as_ref().map(Vec::len)),
        ("bitangents", mesh.bitangents.as_ref().map(Vec::len)),
    ];
    for (name, len) in lengths {
        if let Some(len) = len {
            if len != expected {
                return Err(ViewerError::GeometryMismatch(format!(
                    "mesh {} has {} {} for {} positions",
                    index, len, name, expected
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::import::{matrix_to_row_major, ROW_MAJOR_IDENTITY};
    use cgmath::{InnerSpace, Vector4};

    const EPSILON: f32 = 1e-5;

    fn approx_point(a: Point3<f32>, b: Point3<f32>) -> bool {
        (a - b).magnitude() < EPSILON
    }

    /// Two triangles forming a unit-ish quad tilted out of the xy plane
    fn two_triangles() -> ImportedMesh {
        ImportedMesh {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 1.0],
            ],
            faces: vec![vec![0, 1, 2], vec![0, 2, 3]],
            ..Default::default()
        }
    }

    fn cube_corners(half: f32) -> ImportedMesh {
        let h = half;
        ImportedMesh {
            positions: vec![[-h, -h, -h], [h, -h, -h], [h, h, h], [-h, h, h]],
            faces: vec![vec![0, 1, 2], vec![0, 2, 3]],
            ..Default::default()
        }
    }

    fn single(mesh: ImportedMesh) -> SceneGraph {
        SceneGraph {
            root: SceneNode::new("root").with_mesh(0),
            meshes: vec![mesh],
        }
    }

    fn translation(x: f32, y: f32, z: f32) -> [[f32; 4]; 4] {
        matrix_to_row_major(Matrix4::from_translation(Vector3::new(x, y, z)))
    }

    #[test]
    fn test_two_triangle_load() {
        let model = Model::from_scene(&single(two_triangles()), false).unwrap();
        assert_eq!(model.root.range, VertexRange::new(0, 6));
        assert_eq!(model.geometry.positions.len(), 18);
        assert_eq!(model.vertex_count(), 6);
        assert!(!model.geometry.has_normals());
        assert!(!model.geometry.has_tangents());
    }

    #[test]
    fn test_normalization_maps_box_into_unit_cube() {
        let model = Model::from_scene(&single(cube_corners(2.0)), false).unwrap();
        let t = model.root.transform;

        let center = t.transform_point(Point3::new(0.0, 0.0, 0.0));
        assert!(approx_point(center, Point3::new(0.0, 0.0, 0.0)));

        // scale is 1 / 4, so the corner lands at half a unit on each axis
        let corner = t.transform_point(Point3::new(2.0, 2.0, 2.0));
        assert!(approx_point(corner, Point3::new(0.5, 0.5, 0.5)));
        let distance = (corner - Point3::new(0.0, 0.0, 0.0)).magnitude();
        assert!((distance - 0.5 * 3f32.sqrt()).abs() < EPSILON);
    }

    #[test]
    fn test_normalization_recentres_offset_box() {
        let mesh = ImportedMesh {
            positions: vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 2.0, 1.0]],
            faces: vec![vec![0, 1, 2]],
            ..Default::default()
        };
        let model = Model::from_scene(&single(mesh), false).unwrap();
        let t = model.root.transform;

        assert!(approx_point(
            t.transform_point(Point3::new(2.0, 1.0, 0.5)),
            Point3::new(0.0, 0.0, 0.0)
        ));
        assert!(approx_point(
            t.transform_point(Point3::new(4.0, 2.0, 1.0)),
            Point3::new(0.5, 0.25, 0.125)
        ));
        assert_eq!(model.bounds.extent(), Vector3::new(4.0, 2.0, 1.0));
    }

    #[test]
    fn test_normalization_accounts_for_root_transform() {
        let mut graph = single(cube_corners(1.0));
        graph.root.transform = translation(10.0, 0.0, 0.0);
        let model = Model::from_scene(&graph, false).unwrap();
        // raw origin sits at the world-space centre of the box
        let p = model.root.transform.transform_point(Point3::new(0.0, 0.0, 0.0));
        assert!(approx_point(p, Point3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_invert_negates_scale_and_normals() {
        let mut mesh = cube_corners(2.0);
        mesh.normals = Some(vec![[0.0, 0.0, 1.0]; 4]);
        let model = Model::from_scene(&single(mesh), true).unwrap();

        let corner = model
            .root
            .transform
            .transform_point(Point3::new(2.0, 2.0, 2.0));
        assert!(approx_point(corner, Point3::new(-0.5, -0.5, -0.5)));
        assert!(model
            .geometry
            .normals
            .chunks(3)
            .all(|n| n == [0.0, 0.0, -1.0]));
    }

    #[test]
    fn test_quad_face_is_unsupported() {
        let mut mesh = two_triangles();
        mesh.faces = vec![vec![0, 1, 2, 3]];
        let err = Model::from_scene(&single(mesh), false).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::UnsupportedTopology {
                mesh: 0,
                face: 0,
                arity: 4
            }
        ));
    }

    #[test]
    fn test_flat_model_is_rejected() {
        let mesh = ImportedMesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![vec![0, 1, 2]],
            ..Default::default()
        };
        let err = Model::from_scene(&single(mesh), false).unwrap_err();
        assert!(matches!(err, ViewerError::GeometryMismatch(_)));
    }

    #[test]
    fn test_empty_scene_is_rejected() {
        let graph = SceneGraph {
            root: SceneNode::new("root"),
            meshes: Vec::new(),
        };
        assert!(matches!(
            Model::from_scene(&graph, false),
            Err(ViewerError::GeometryMismatch(_))
        ));
    }

    #[test]
    fn test_misaligned_normals_are_rejected() {
        let mut mesh = two_triangles();
        mesh.normals = Some(vec![[0.0, 0.0, 1.0]; 3]);
        assert!(matches!(
            Model::from_scene(&single(mesh), false),
            Err(ViewerError::GeometryMismatch(_))
        ));
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut mesh = two_triangles();
        mesh.faces = vec![vec![0, 1, 7]];
        assert!(matches!(
            Model::from_scene(&single(mesh), false),
            Err(ViewerError::GeometryMismatch(_))
        ));
    }

    #[test]
    fn test_mixed_attribute_availability_is_rejected() {
        let mut textured = two_triangles();
        textured.uvs = Some(vec![[0.0, 0.0]; 4]);
        let graph = SceneGraph {
            root: SceneNode::new("root")
                .with_child(SceneNode::new("a").with_mesh(0))
                .with_child(SceneNode::new("b").with_mesh(1)),
            meshes: vec![textured, cube_corners(1.0)],
        };
        assert!(matches!(
            Model::from_scene(&graph, false),
            Err(ViewerError::GeometryMismatch(_))
        ));
    }

    #[test]
    fn test_tangents_need_normals_and_uvs() {
        let mut mesh = two_triangles();
        mesh.uvs = Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        let model = Model::from_scene(&single(mesh.clone()), false).unwrap();
        assert!(model.geometry.has_uvs());
        assert!(!model.geometry.has_tangents());

        mesh.normals = Some(vec![[0.0, -1.0, 1.0]; 4]);
        let model = Model::from_scene(&single(mesh), false).unwrap();
        assert_eq!(model.geometry.tangents.len(), 18);
        assert_eq!(model.geometry.binormals.len(), 18);
        assert!(model.geometry.misaligned_attribute().is_none());
    }

    #[test]
    fn test_imported_tangents_are_used() {
        let mut mesh = two_triangles();
        mesh.normals = Some(vec![[0.0, 0.0, 1.0]; 4]);
        mesh.uvs = Some(vec![[0.0, 0.0]; 4]);
        mesh.tangents = Some(vec![[0.0, 1.0, 0.0]; 4]);
        mesh.bitangents = Some(vec![[1.0, 0.0, 0.0]; 4]);
        let model = Model::from_scene(&single(mesh), false).unwrap();
        assert!(model.geometry.tangents.chunks(3).all(|t| t == [0.0, 1.0, 0.0]));
        assert!(model.geometry.binormals.chunks(3).all(|b| b == [1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_hierarchy_ranges_follow_source_order() {
        let graph = SceneGraph {
            root: SceneNode::new("root")
                .with_child(
                    SceneNode::new("a")
                        .with_transform(translation(1.0, 0.0, 0.0))
                        .with_mesh(0)
                        .with_child(SceneNode::new("a1").with_mesh(1)),
                )
                .with_child(SceneNode::new("b").with_mesh(0).with_mesh(1)),
            meshes: vec![two_triangles(), cube_corners(1.0)],
        };
        let model = Model::from_scene(&graph, false).unwrap();
        let root = &model.root;

        assert!(root.range.is_empty());
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].range, VertexRange::new(0, 6));
        assert_eq!(root.children[0].children[0].range, VertexRange::new(6, 6));
        // both meshes of one node share a contiguous range
        assert_eq!(root.children[1].range, VertexRange::new(12, 12));
        assert_eq!(model.vertex_count(), 24);

        assert_eq!(
            root.children[0].transform.w,
            Vector4::new(1.0, 0.0, 0.0, 1.0)
        );
        assert_eq!(
            matrix_to_row_major(root.children[1].transform),
            ROW_MAJOR_IDENTITY
        );
    }

    #[test]
    fn test_bounds_use_accumulated_transforms() {
        let graph = SceneGraph {
            root: SceneNode::new("root")
                .with_transform(translation(0.0, 5.0, 0.0))
                .with_child(
                    SceneNode::new("child")
                        .with_transform(translation(3.0, 0.0, 0.0))
                        .with_mesh(0),
                ),
            meshes: vec![cube_corners(1.0)],
        };
        let bounds = scene_bounds(&graph).unwrap();
        assert_eq!(bounds.min, Vector3::new(2.0, 4.0, -1.0));
        assert_eq!(bounds.max, Vector3::new(4.0, 6.0, 1.0));
    }

    #[test]
    fn test_missing_mesh_reference() {
        let graph = SceneGraph {
            root: SceneNode::new("root").with_mesh(3),
            meshes: vec![two_triangles()],
        };
        assert!(matches!(
            Model::from_scene(&graph, false),
            Err(ViewerError::GeometryMismatch(_))
        ));
    }
}
