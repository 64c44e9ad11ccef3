//! Triangulated cortical surface

use crate::error::DataIntegrityError;

/// Triangulated surface for one hemisphere
///
/// Immutable after construction. Every face index is checked against the
/// vertex count, and normals are either supplied per vertex or derived from
/// the faces.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMesh {
    positions: Vec<[f32; 3]>,
    faces: Vec<[u32; 3]>,
    normals: Vec<[f32; 3]>,
}

impl SurfaceMesh {
    /// Build a mesh, validating face indices
    ///
    /// When `normals` is `None`, area-weighted vertex normals are computed.
    pub fn new(
        positions: Vec<[f32; 3]>,
        faces: Vec<[u32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
    ) -> Result<Self, DataIntegrityError> {
        let vertex_count = positions.len();
        for (face_idx, face) in faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(DataIntegrityError::FaceIndexOutOfRange {
                    face: face_idx,
                    index: bad,
                    vertex_count,
                });
            }
        }

        let normals = match normals {
            Some(n) if n.len() != vertex_count => {
                return Err(DataIntegrityError::NormalCountMismatch {
                    vertices: vertex_count,
                    normals: n.len(),
                });
            }
            Some(n) => n,
            None => compute_vertex_normals(&positions, &faces),
        };

        Ok(Self {
            positions,
            faces,
            normals,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Axis-aligned bounds `(min, max)`, or `None` for an empty mesh
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.positions[1..] {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some((min, max))
    }
}

/// Area-weighted vertex normals
///
/// Each face contributes its unnormalized cross product to its three vertices,
/// so larger faces weigh more. Vertices not referenced by any face get +Z.
pub fn compute_vertex_normals(positions: &[[f32; 3]], faces: &[[u32; 3]]) -> Vec<[f32; 3]> {
    let mut acc = vec![[0.0f32; 3]; positions.len()];

    for face in faces {
        let [a, b, c] = face.map(|i| positions[i as usize]);
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        for &i in face {
            let slot = &mut acc[i as usize];
            slot[0] += n[0];
            slot[1] += n[1];
            slot[2] += n[2];
        }
    }

    acc.into_iter()
        .map(|n| {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            if len > f32::EPSILON {
                [n[0] / len, n[1] / len, n[2] / len]
            } else {
                [0.0, 0.0, 1.0]
            }
        })
        .collect()
}
