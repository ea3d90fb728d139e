//! Owned face-vertex triangle mesh.

use nalgebra::Point3;

use crate::error::{MeshError, Result};

use super::MeshContext;

/// A triangle mesh stored as a vertex array and a triangle index array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,
    /// Triangles as indices into `vertices`.
    pub faces: Vec<[usize; 3]>,
}

impl TriMesh {
    /// Create a mesh from vertices and faces without validating it.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Check that the mesh is non-empty and every face index is in range.
    pub fn validate(&self) -> Result<()> {
        validate_mesh(&self.vertices, &self.faces)
    }

    /// Build the derived [`MeshContext`] for this mesh.
    pub fn context(&self) -> Result<MeshContext<'_>> {
        MeshContext::new(&self.vertices, &self.faces)
    }

    /// Axis-aligned bounding box, or `None` for a mesh without vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }

    /// Average length over all face edges (shared edges are counted once per face).
    pub fn average_edge_length(&self) -> f64 {
        if self.faces.is_empty() {
            return 0.0;
        }
        let mut total = 0.0;
        for face in &self.faces {
            for k in 0..3 {
                let a = self.vertices[face[k]];
                let b = self.vertices[face[(k + 1) % 3]];
                total += (b - a).norm();
            }
        }
        total / (3 * self.faces.len()) as f64
    }

    /// Replace the vertex positions, keeping the faces.
    ///
    /// Returns an error if the new array has a different length.
    pub fn with_positions(&self, positions: Vec<Point3<f64>>) -> Result<TriMesh> {
        if positions.len() != self.vertices.len() {
            return Err(MeshError::invalid_param(
                "positions",
                positions.len(),
                "must match the vertex count",
            ));
        }
        Ok(TriMesh {
            vertices: positions,
            faces: self.faces.clone(),
        })
    }
}

/// Validate a face-vertex mesh.
///
/// Fails with [`MeshError::NoVertices`], [`MeshError::EmptyMesh`] or
/// [`MeshError::InvalidVertexIndex`].
pub fn validate_mesh(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<()> {
    if vertices.is_empty() {
        return Err(MeshError::NoVertices);
    }
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes;

    #[test]
    fn test_validate_ok() {
        let mesh = test_meshes::single_triangle();
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validate_out_of_range() {
        let mesh = TriMesh::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            vec![[0, 1, 2]],
        );
        match mesh.validate() {
            Err(MeshError::InvalidVertexIndex { face: 0, vertex: 2 }) => (),
            other => panic!("Expected InvalidVertexIndex, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_empty() {
        assert!(matches!(
            TriMesh::default().validate(),
            Err(MeshError::NoVertices)
        ));
        let no_faces = TriMesh::new(vec![Point3::origin()], vec![]);
        assert!(matches!(no_faces.validate(), Err(MeshError::EmptyMesh)));
        assert!(no_faces.validate().unwrap_err().is_invalid_mesh());
    }

    #[test]
    fn test_bounding_box_and_edges() {
        let mesh = test_meshes::flat_quad();
        let (lo, hi) = mesh.bounding_box().unwrap();
        assert_eq!(lo, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(hi, Point3::new(1.0, 1.0, 0.0));

        // 4 unit sides (one per face each counted once) and the diagonal twice.
        let expected = (4.0 + 2.0 * 2.0_f64.sqrt()) / 6.0;
        assert!((mesh.average_edge_length() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_with_positions_length_mismatch() {
        let mesh = test_meshes::single_triangle();
        assert!(mesh.with_positions(vec![Point3::origin()]).is_err());
        let moved = mesh.with_positions(mesh.vertices.clone()).unwrap();
        assert_eq!(moved, mesh);
    }
}
