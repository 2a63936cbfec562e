use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix};

use super::mesh_part::{MeshPart, VertexRange};

/// Matrices the shader needs for one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransforms {
    pub model_view: Matrix4<f32>,
    /// Accumulated model transform of the node
    pub world: Matrix4<f32>,
    pub normal: Matrix3<f32>,
    pub projection: Matrix4<f32>,
}

impl NodeTransforms {
    pub fn new(view: Matrix4<f32>, world: Matrix4<f32>, projection: Matrix4<f32>) -> Self {
        let model_view = view * world;
        Self {
            model_view,
            world,
            normal: normal_matrix(&model_view),
            projection,
        }
    }

    pub fn to_uniforms(&self) -> NodeUniforms {
        let n = self.normal;
        NodeUniforms {
            model_view: self.model_view.into(),
            model: self.world.into(),
            normal: [
                [n.x.x, n.x.y, n.x.z, 0.0],
                [n.y.x, n.y.y, n.y.z, 0.0],
                [n.z.x, n.z.y, n.z.z, 0.0],
            ],
            projection: self.projection.into(),
        }
    }
}

/// Per-node uniform block; the normal matrix columns are padded to vec4 to
/// match WGSL's `mat3x3<f32>` layout
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NodeUniforms {
    pub model_view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub projection: [[f32; 4]; 4],
}

/// Inverse-transpose of the upper 3x3 of `model_view`
pub fn normal_matrix(model_view: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = Matrix3::from_cols(
        model_view.x.truncate(),
        model_view.y.truncate(),
        model_view.z.truncate(),
    );
    upper
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or_else(Matrix3::identity)
}

/// Sink for the traversal's per-node work
pub trait DrawTarget {
    /// Makes `transforms` current for the following draw
    fn upload_node(&mut self, transforms: &NodeTransforms);
    /// Draws the triangles in `range` with the current node's transforms
    fn draw_range(&mut self, range: VertexRange);
}

/// Depth-first render walk
///
/// Every node uploads its transforms; only nodes that own vertices draw.
/// Children follow their parent in stored order.
pub fn render_hierarchy<T: DrawTarget + ?Sized>(
    node: &MeshPart,
    view: Matrix4<f32>,
    parent: Matrix4<f32>,
    projection: Matrix4<f32>,
    target: &mut T,
) {
    let world = parent * node.transform;
    target.upload_node(&NodeTransforms::new(view, world, projection));

    if !node.range.is_empty() {
        target.draw_range(node.range);
    }

    for child in &node.children {
        render_hierarchy(child, view, world, projection, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, InnerSpace, Vector3, Vector4};

    #[derive(Debug, PartialEq)]
    enum Call {
        Upload(Matrix4<f32>),
        Draw(VertexRange),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        transforms: Vec<NodeTransforms>,
    }

    impl DrawTarget for Recorder {
        fn upload_node(&mut self, transforms: &NodeTransforms) {
            self.calls.push(Call::Upload(transforms.world));
            self.transforms.push(*transforms);
        }

        fn draw_range(&mut self, range: VertexRange) {
            self.calls.push(Call::Draw(range));
        }
    }

    fn approx(a: Vector4<f32>, b: Vector4<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    fn chain() -> (MeshPart, [Matrix4<f32>; 3]) {
        let root = Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0));
        let child = Matrix4::from_angle_z(Deg(90.0));
        let grandchild = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);

        let tree = MeshPart::new("root", root, VertexRange::new(0, 3)).with_child(
            MeshPart::new("child", child, VertexRange::new(3, 3)).with_child(MeshPart::new(
                "grandchild",
                grandchild,
                VertexRange::new(6, 3),
            )),
        );
        (tree, [root, child, grandchild])
    }

    #[test]
    fn test_three_node_chain_accumulates_transforms() {
        let (tree, [root, child, grandchild]) = chain();
        let mut recorder = Recorder::default();
        render_hierarchy(
            &tree,
            Matrix4::identity(),
            Matrix4::identity(),
            Matrix4::identity(),
            &mut recorder,
        );

        let world = recorder.transforms[2].world;
        assert_eq!(world, root * child * grandchild);

        // scale x by 2, rotate onto y, shift by 1 in x
        let p = world * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!(approx(p, Vector4::new(1.0, 2.0, 0.0, 1.0)));
    }

    #[test]
    fn test_draw_order_is_pre_order() {
        let tree = MeshPart::group("root")
            .with_child(
                MeshPart::new("a", Matrix4::identity(), VertexRange::new(0, 3))
                    .with_child(MeshPart::new("a1", Matrix4::identity(), VertexRange::new(3, 6))),
            )
            .with_child(MeshPart::new("b", Matrix4::identity(), VertexRange::new(9, 3)));

        let mut recorder = Recorder::default();
        let identity = Matrix4::identity();
        render_hierarchy(&tree, identity, identity, identity, &mut recorder);

        let draws: Vec<_> = recorder
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Draw(range) => Some(*range),
                Call::Upload(_) => None,
            })
            .collect();
        assert_eq!(
            draws,
            [
                VertexRange::new(0, 3),
                VertexRange::new(3, 6),
                VertexRange::new(9, 3)
            ]
        );
        // the empty root uploads but does not draw
        assert_eq!(recorder.transforms.len(), 4);
        assert!(matches!(recorder.calls[0], Call::Upload(_)));
        assert!(matches!(recorder.calls[1], Call::Upload(_)));
    }

    #[test]
    fn test_model_view_includes_view() {
        let (tree, _) = chain();
        let view = Matrix4::from_translation(Vector3::new(0.0, 0.0, -10.0));
        let projection = cgmath::perspective(Deg(45.0), 1.0, 0.5, 30.0);
        let mut recorder = Recorder::default();
        render_hierarchy(&tree, view, Matrix4::identity(), projection, &mut recorder);

        for t in &recorder.transforms {
            assert_eq!(t.model_view, view * t.world);
            assert_eq!(t.projection, projection);
        }
    }

    #[test]
    fn test_normal_matrix_keeps_normals_perpendicular() {
        let model_view = Matrix4::from_nonuniform_scale(4.0, 1.0, 1.0);
        let normal = normal_matrix(&model_view);

        // surface along the x=y diagonal with its normal
        let tangent = Vector3::new(1.0, -1.0, 0.0);
        let n = Vector3::new(1.0, 1.0, 0.0);
        let upper = Matrix3::from_cols(
            model_view.x.truncate(),
            model_view.y.truncate(),
            model_view.z.truncate(),
        );
        assert!((upper * tangent).dot(normal * n).abs() < 1e-5);
    }

    #[test]
    fn test_singular_model_view_falls_back() {
        let normal = normal_matrix(&Matrix4::from_scale(0.0));
        assert_eq!(normal, Matrix3::identity());
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<NodeUniforms>(), 240);
        let t = NodeTransforms::new(
            Matrix4::identity(),
            Matrix4::from_scale(2.0),
            Matrix4::identity(),
        );
        let u = t.to_uniforms();
        assert_eq!(u.model[0][0], 2.0);
        assert_eq!(u.normal[0], [0.5, 0.0, 0.0, 0.0]);
    }
}
