//! Core mesh data structures.
//!
//! This module provides the face-vertex triangle mesh and the structures
//! derived from it that the deformation algorithms work on.
//!
//! # Overview
//!
//! - [`TriMesh`] owns a vertex array and a triangle index array. It is what the
//!   file loaders produce and what the CLI writes back out.
//! - [`Adjacency`] is the symmetric vertex-neighbor relation in compressed
//!   form: one flat neighbor array plus per-vertex offsets.
//! - [`CotangentWeights`] stores one scalar per directed adjacency slot, laid
//!   out in parallel with [`Adjacency::neighbors`].
//! - [`MeshContext`] bundles the rest-pose positions, faces, adjacency and
//!   weights into one immutable value that every algorithm stage borrows.
//!
//! # Construction
//!
//! ```
//! use elastic_mesh::mesh::MeshContext;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let ctx = MeshContext::new(&vertices, &faces).unwrap();
//! assert_eq!(ctx.adjacency().neighbors(0), &[1, 2]);
//! ```

mod context;
mod cotangent;
mod topology;
mod trimesh;

pub use context::MeshContext;
pub use cotangent::CotangentWeights;
pub use topology::Adjacency;
pub use trimesh::{validate_mesh, TriMesh};
