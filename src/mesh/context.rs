//! Immutable per-call mesh context.

use nalgebra::{Point3, Vector3};

use crate::error::Result;

use super::{validate_mesh, Adjacency, CotangentWeights};

/// Rest-pose mesh data shared by every stage of a deformation.
///
/// Built once per call from borrowed vertex and face arrays. Nothing in it
/// changes while the solver runs; the evolving positions live in the solver's
/// own state.
#[derive(Debug, Clone)]
pub struct MeshContext<'a> {
    vertices: &'a [Point3<f64>],
    faces: &'a [[usize; 3]],
    adjacency: Adjacency,
    weights: CotangentWeights,
}

impl<'a> MeshContext<'a> {
    /// Validate the mesh and derive its adjacency and cotangent weights.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::NoVertices`],
    /// [`crate::error::MeshError::EmptyMesh`] or
    /// [`crate::error::MeshError::InvalidVertexIndex`] for malformed input.
    pub fn new(vertices: &'a [Point3<f64>], faces: &'a [[usize; 3]]) -> Result<Self> {
        validate_mesh(vertices, faces)?;
        let adjacency = Adjacency::from_faces(vertices.len(), faces)?;
        let weights = CotangentWeights::compute(vertices, faces, &adjacency);
        Ok(Self {
            vertices,
            faces,
            adjacency,
            weights,
        })
    }

    /// Rest-pose vertex positions.
    #[inline]
    pub fn vertices(&self) -> &'a [Point3<f64>] {
        self.vertices
    }

    /// Triangle faces.
    #[inline]
    pub fn faces(&self) -> &'a [[usize; 3]] {
        self.faces
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex adjacency.
    #[inline]
    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// Cotangent weights, parallel to the adjacency slots.
    #[inline]
    pub fn weights(&self) -> &CotangentWeights {
        &self.weights
    }

    /// Rest position of vertex `v`.
    #[inline]
    pub fn position(&self, v: usize) -> &Point3<f64> {
        &self.vertices[v]
    }

    /// Rest-pose edge vector from `j` to `i`.
    #[inline]
    pub fn rest_edge(&self, i: usize, j: usize) -> Vector3<f64> {
        self.vertices[i] - self.vertices[j]
    }

    /// Iterate over the neighbors of `v` together with the edge weight.
    pub fn weighted_neighbors(&self, v: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.adjacency
            .neighbors(v)
            .iter()
            .copied()
            .zip(self.weights.weights_of(&self.adjacency, v).iter().copied())
    }
}
