//! # Scene Import
//!
//! Importer-neutral scene graphs and the importers that produce them.
//!
//! A [`SceneGraph`] is what the model loader consumes: a tree of nodes, each
//! with a local transform and the indices of the meshes it owns, plus a flat
//! list of meshes. Node transforms are stored **row-major**, the convention
//! of interchange formats; [`row_major_to_matrix`] is the single place where
//! they are turned into cgmath's column-major matrices.
//!
//! Two importers are provided:
//! - [`ObjImporter`] (via `tobj`): one child node per OBJ object under an
//!   identity root.
//! - [`GltfImporter`] (via `gltf`): the full node hierarchy of the default
//!   scene.

use std::{collections::HashMap, path::Path};

use cgmath::{Matrix, Matrix4, Vector3};
use log::{debug, info};

use crate::error::{Result, ViewerError};

/// Row-major 4x4 matrix: `m[row][column]`
pub type RowMajorMatrix = [[f32; 4]; 4];

pub const ROW_MAJOR_IDENTITY: RowMajorMatrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Converts a row-major importer matrix into a column-major cgmath matrix
pub fn row_major_to_matrix(m: &RowMajorMatrix) -> Matrix4<f32> {
    // cgmath reads nested arrays as columns, so the rows land as columns
    // and a transpose puts them back
    Matrix4::from(*m).transpose()
}

/// Inverse of [`row_major_to_matrix`]
pub fn matrix_to_row_major(m: Matrix4<f32>) -> RowMajorMatrix {
    m.transpose().into()
}

/// One mesh as delivered by an importer
///
/// Optional attributes are either absent or hold exactly one entry per
/// position. Faces are index lists of arbitrary arity.
#[derive(Debug, Clone, Default)]
pub struct ImportedMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    pub faces: Vec<Vec<u32>>,
}

/// A node of the imported hierarchy
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: RowMajorMatrix,
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: ROW_MAJOR_IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: RowMajorMatrix) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: usize) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}

/// Imported scene: node tree plus the meshes the nodes refer to
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub root: SceneNode,
    pub meshes: Vec<ImportedMesh>,
}

/// Anything that can turn a file into a [`SceneGraph`]
pub trait SceneImporter {
    fn import(&self, path: &Path) -> Result<SceneGraph>;
}

/// Imports a scene, picking the importer from the file extension
pub fn import_scene(path: &Path) -> Result<SceneGraph> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let graph = match extension.as_deref() {
        Some("obj") => ObjImporter.import(path)?,
        Some("gltf") | Some("glb") => GltfImporter.import(path)?,
        _ => {
            return Err(ViewerError::asset_load(
                path,
                "unrecognised model format (expected .obj, .gltf or .glb)",
            ))
        }
    };

    info!(
        "Imported {}: {} nodes, {} meshes",
        path.display(),
        graph.root.node_count(),
        graph.meshes.len()
    );
    Ok(graph)
}

/// Wavefront OBJ importer
pub struct ObjImporter;

impl SceneImporter for ObjImporter {
    fn import(&self, path: &Path) -> Result<SceneGraph> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|e| ViewerError::asset_load(path, e))?;

        if let Err(e) = materials {
            debug!("No usable MTL for {}: {}", path.display(), e);
        }

        let mut root = SceneNode::new("root");
        let mut meshes = Vec::with_capacity(models.len());
        for (index, model) in models.into_iter().enumerate() {
            meshes.push(obj_mesh(&model.mesh));
            root.children.push(SceneNode::new(model.name).with_mesh(index));
        }

        Ok(SceneGraph { root, meshes })
    }
}

fn obj_mesh(mesh: &tobj::Mesh) -> ImportedMesh {
    let vec3s = |data: &[f32]| -> Vec<[f32; 3]> {
        data.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
    };

    let positions = vec3s(&mesh.positions);
    let normals = (!mesh.normals.is_empty()).then(|| vec3s(&mesh.normals));
    let uvs = (!mesh.texcoords.is_empty()).then(|| {
        mesh.texcoords
            .chunks_exact(2)
            .map(|c| [c[0], c[1]])
            .collect()
    });
    let colors = (!mesh.vertex_color.is_empty()).then(|| {
        mesh.vertex_color
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2], 1.0])
            .collect()
    });

    let faces = if mesh.face_arities.is_empty() {
        mesh.indices.chunks(3).map(<[u32]>::to_vec).collect()
    } else {
        let mut faces = Vec::with_capacity(mesh.face_arities.len());
        let mut start = 0usize;
        for &arity in &mesh.face_arities {
            let end = (start + arity as usize).min(mesh.indices.len());
            faces.push(mesh.indices[start..end].to_vec());
            start = end;
        }
        faces
    };

    ImportedMesh {
        positions,
        normals,
        colors,
        uvs,
        tangents: None,
        bitangents: None,
        faces,
    }
}

/// glTF 2.0 importer (`.gltf` and `.glb`)
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path) -> Result<SceneGraph> {
        let (document, buffers, _images) =
            gltf::import(path).map_err(|e| ViewerError::asset_load(path, e))?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| ViewerError::asset_load(path, "file contains no scene"))?;

        let mut converter = GltfConverter {
            path,
            buffers: &buffers,
            meshes: Vec::new(),
            converted: HashMap::new(),
        };

        let mut roots = scene
            .nodes()
            .map(|node| converter.node(&node))
            .collect::<Result<Vec<_>>>()?;

        let root = if roots.len() == 1 {
            roots.remove(0)
        } else {
            SceneNode {
                children: roots,
                ..SceneNode::new("root")
            }
        };

        Ok(SceneGraph {
            root,
            meshes: converter.meshes,
        })
    }
}

struct GltfConverter<'a> {
    path: &'a Path,
    buffers: &'a [gltf::buffer::Data],
    meshes: Vec<ImportedMesh>,
    /// glTF mesh index -> our mesh indices (one per primitive)
    converted: HashMap<usize, Vec<usize>>,
}

impl GltfConverter<'_> {
    fn node(&mut self, node: &gltf::Node) -> Result<SceneNode> {
        let columns = node.transform().matrix();
        let mut scene_node = SceneNode::new(node.name().unwrap_or("node"))
            .with_transform(matrix_to_row_major(Matrix4::from(columns)));

        if let Some(mesh) = node.mesh() {
            scene_node.meshes = self.mesh(&mesh)?;
        }

        for child in node.children() {
            scene_node.children.push(self.node(&child)?);
        }
        Ok(scene_node)
    }

    fn mesh(&mut self, mesh: &gltf::Mesh) -> Result<Vec<usize>> {
        if let Some(indices) = self.converted.get(&mesh.index()) {
            return Ok(indices.clone());
        }

        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            let imported = self.primitive(&primitive)?;
            indices.push(self.meshes.len());
            self.meshes.push(imported);
        }
        self.converted.insert(mesh.index(), indices.clone());
        Ok(indices)
    }

    fn primitive(&self, primitive: &gltf::Primitive) -> Result<ImportedMesh> {
        let buffers = self.buffers;
        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| ViewerError::asset_load(self.path, "primitive without positions"))?
            .collect();
        let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
        let uvs = reader
            .read_tex_coords(0)
            .map(|coords| coords.into_f32().collect());
        let colors = reader
            .read_colors(0)
            .map(|colors| colors.into_rgba_f32().collect());

        // glTF stores bitangents implicitly through the tangent's w sign
        let (tangents, bitangents) = match (reader.read_tangents(), &normals) {
            (Some(tangents), Some(normals)) => {
                let tangents: Vec<[f32; 4]> = tangents.collect();
                let bitangents: Vec<[f32; 3]> = tangents
                    .iter()
                    .zip(normals)
                    .map(|(t, n)| {
                        let b = Vector3::from(*n).cross(Vector3::new(t[0], t[1], t[2])) * t[3];
                        b.into()
                    })
                    .collect();
                let tangents: Vec<[f32; 3]> = tangents.iter().map(|t| [t[0], t[1], t[2]]).collect();
                (Some(tangents), Some(bitangents))
            }
            _ => (None, None),
        };

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        Ok(ImportedMesh {
            positions,
            normals,
            colors,
            uvs,
            tangents,
            bitangents,
            faces: faces_for_mode(primitive.mode(), &indices),
        })
    }
}

/// Splits a glTF index stream into faces
///
/// Strips and fans are expanded into triangles; point and line modes keep
/// their true arity so the loader can reject them.
pub fn faces_for_mode(mode: gltf::mesh::Mode, indices: &[u32]) -> Vec<Vec<u32>> {
    use gltf::mesh::Mode;

    match mode {
        Mode::Triangles => indices.chunks(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                if i % 2 == 0 {
                    vec![w[0], w[1], w[2]]
                } else {
                    vec![w[1], w[0], w[2]]
                }
            })
            .collect(),
        Mode::TriangleFan => indices
            .windows(2)
            .skip(1)
            .map(|w| vec![indices[0], w[0], w[1]])
            .collect(),
        Mode::Points => indices.chunks(1).map(<[u32]>::to_vec).collect(),
        Mode::Lines | Mode::LineLoop | Mode::LineStrip => {
            indices.chunks(2).map(<[u32]>::to_vec).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{SquareMatrix, Vector4};
    use gltf::mesh::Mode;

    #[test]
    fn test_row_major_translation_lands_in_last_column() {
        let row_major = [
            [1.0, 0.0, 0.0, 3.0],
            [0.0, 1.0, 0.0, 4.0],
            [0.0, 0.0, 1.0, 5.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let m = row_major_to_matrix(&row_major);
        assert_eq!(m.w, Vector4::new(3.0, 4.0, 5.0, 1.0));
        let p = m * Vector4::new(1.0, 1.0, 1.0, 1.0);
        assert_eq!(p, Vector4::new(4.0, 5.0, 6.0, 1.0));
    }

    #[test]
    fn test_row_major_conversion_round_trips() {
        let row_major = [
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ];
        let m = row_major_to_matrix(&row_major);
        // element (row 1, column 2)
        assert_eq!(m.z.y, 7.0);
        assert_eq!(matrix_to_row_major(m), row_major);
    }

    #[test]
    fn test_triangle_strip_alternates_winding() {
        let faces = faces_for_mode(Mode::TriangleStrip, &[0, 1, 2, 3]);
        assert_eq!(faces, vec![vec![0, 1, 2], vec![2, 1, 3]]);
    }

    #[test]
    fn test_triangle_fan_shares_first_vertex() {
        let faces = faces_for_mode(Mode::TriangleFan, &[0, 1, 2, 3]);
        assert_eq!(faces, vec![vec![0, 1, 2], vec![0, 2, 3]]);
    }

    #[test]
    fn test_line_modes_keep_their_arity() {
        let faces = faces_for_mode(Mode::Lines, &[0, 1, 2, 3]);
        assert!(faces.iter().all(|face| face.len() == 2));
    }

    #[test]
    fn test_unknown_extension_is_asset_error() {
        let err = import_scene(Path::new("model.fbx")).unwrap_err();
        assert!(matches!(err, ViewerError::AssetLoad { .. }));
    }

    #[test]
    fn test_missing_obj_is_asset_error() {
        let err = import_scene(Path::new("does/not/exist.obj")).unwrap_err();
        assert!(matches!(err, ViewerError::AssetLoad { .. }));
    }

    #[test]
    fn test_obj_mesh_conversion() {
        let mesh = tobj::Mesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            texcoords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let imported = obj_mesh(&mesh);
        assert_eq!(imported.positions.len(), 3);
        assert!(imported.normals.is_none());
        assert_eq!(imported.uvs.as_ref().map(Vec::len), Some(3));
        assert_eq!(imported.faces, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_obj_face_arities_are_respected() {
        let mesh = tobj::Mesh {
            positions: vec![0.0; 12],
            indices: vec![0, 1, 2, 3],
            face_arities: vec![4],
            ..Default::default()
        };
        assert_eq!(obj_mesh(&mesh).faces, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_node_count() {
        let root = SceneNode::new("root")
            .with_child(SceneNode::new("a").with_child(SceneNode::new("b")))
            .with_child(SceneNode::new("c"));
        assert_eq!(root.node_count(), 4);
        assert_eq!(row_major_to_matrix(&root.transform), Matrix4::identity());
    }
}
