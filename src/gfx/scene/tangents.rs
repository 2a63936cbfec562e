//! Per-face tangent frame generation for normal mapping

use cgmath::{InnerSpace, Vector2, Vector3};

const DEGENERATE_EPSILON: f32 = 1e-8;

/// Tangent and binormal for each corner of one triangle
pub struct FaceTangents {
    pub tangents: [Vector3<f32>; 3],
    pub binormals: [Vector3<f32>; 3],
}

/// Computes tangent frames for a triangle from its positions and UVs
///
/// The face tangent/bitangent pair comes from solving the edge vectors
/// against the UV deltas. Each corner's tangent is then orthogonalised
/// against that corner's normal and flipped when the frame is left-handed.
pub fn face_tangents(
    positions: [Vector3<f32>; 3],
    normals: [Vector3<f32>; 3],
    uvs: [Vector2<f32>; 3],
) -> FaceTangents {
    let edge1 = positions[1] - positions[0];
    let edge2 = positions[2] - positions[0];
    let duv1 = uvs[1] - uvs[0];
    let duv2 = uvs[2] - uvs[0];

    let det = duv1.x * duv2.y - duv2.x * duv1.y;
    let (face_tangent, face_binormal) = if det.abs() > DEGENERATE_EPSILON {
        let r = 1.0 / det;
        (
            (edge1 * duv2.y - edge2 * duv1.y) * r,
            (edge2 * duv1.x - edge1 * duv2.x) * r,
        )
    } else {
        // no usable UV mapping on this face
        (Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0))
    };

    let mut tangents = [Vector3::new(0.0, 0.0, 0.0); 3];
    let mut binormals = [Vector3::new(0.0, 0.0, 0.0); 3];
    for corner in 0..3 {
        let n = safe_normalize(normals[corner]).unwrap_or(Vector3::unit_z());
        let mut t = match safe_normalize(face_tangent - n * n.dot(face_tangent)) {
            Some(t) => t,
            None => any_perpendicular(n),
        };
        if n.cross(t).dot(face_binormal) < 0.0 {
            t = -t;
        }
        let b = safe_normalize(face_binormal).unwrap_or_else(|| n.cross(t));

        tangents[corner] = t;
        binormals[corner] = b;
    }

    FaceTangents {
        tangents,
        binormals,
    }
}

fn safe_normalize(v: Vector3<f32>) -> Option<Vector3<f32>> {
    let len = v.magnitude();
    (len > DEGENERATE_EPSILON && len.is_finite()).then(|| v / len)
}

/// Some unit vector perpendicular to `n`
fn any_perpendicular(n: Vector3<f32>) -> Vector3<f32> {
    let helper = if n.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    (helper - n * n.dot(helper)).normalize()
}
