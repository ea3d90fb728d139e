//! # elastic-mesh
//!
//! Pin-driven shape deformation for triangle meshes.
//!
//! The caller pins a few vertices to new positions; everything else follows
//! as rigidly as the surface allows. Close to a pin the result tracks a smooth
//! inverse-distance displacement field, farther away it is governed by an
//! as-rigid-as-possible (ARAP) energy solve, with a per-pin falloff deciding
//! the mix.
//!
//! ## Features
//!
//! - **Edge-path geodesics**: per-pin Dijkstra, parallel across pins
//! - **Rigid pre-fit**: Kabsch alignment of the pins before interpolation
//! - **Cotangent ARAP**: reduced Laplacian assembled once, warm-started CG per axis
//! - **Falloff blending**: Gaussian or inverse-power, per pin
//! - **File formats**: OBJ, STL, PLY meshes and JSON pin files
//!
//! ## Quick Start
//!
//! ```no_run
//! use elastic_mesh::prelude::*;
//!
//! let mesh = elastic_mesh::io::load("model.obj").unwrap();
//! let pins = elastic_mesh::io::pins::load("pins.json").unwrap();
//!
//! let positions = deform(&mesh.vertices, &mesh.faces, &pins, &DeformOptions::default()).unwrap();
//! let deformed = mesh.with_positions(positions).unwrap();
//!
//! elastic_mesh::io::save(&deformed, "deformed.obj").unwrap();
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use elastic_mesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! // Pin one corner in place and lift another.
//! let pins = vec![
//!     Pin::new(0, Point3::new(0.0, 0.0, 0.0)),
//!     Pin::new(1, Point3::new(1.0, 0.0, 0.5)),
//! ];
//!
//! let options = DeformOptions::default().with_iterations(5);
//! let positions = deform(&vertices, &faces, &pins, &options).unwrap();
//! assert_eq!(positions[1], Point3::new(1.0, 0.0, 0.5));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;

#[cfg(test)]
mod test_meshes;

pub use nalgebra;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use elastic_mesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{
        deform, deform_with_progress, BlendWeighting, DeformOptions, Deformation, FalloffMetric,
        Pin, Progress, UnreachablePolicy,
    };
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{MeshContext, TriMesh};
}
