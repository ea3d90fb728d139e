//! Deformation algorithms.
//!
//! This module contains the building blocks of a pin-driven deformation:
//!
//! - **Geodesics**: edge-path shortest distances from each pin
//! - **Rigid fitting**: closest proper rotation to a covariance, Kabsch alignment
//! - **Inverse distance**: closed-form displacement field exact at the pins
//! - **ARAP**: local/global as-rigid-as-possible iterations
//! - **Falloff**: per-pin influence curves and the final blend
//!
//! [`deform`] chains them together. The stages are public so they can be
//! run and inspected individually.

pub mod arap;
pub mod deform;
pub mod falloff;
pub mod geodesic;
pub mod idw;
pub mod progress;
pub mod rigid;
pub mod rotation;
pub mod sparse;

pub use arap::{ArapOptions, ArapResult, ArapSolver, FixedVertex};
pub use deform::{
    deform, deform_with_progress, validate_pins, DeformOptions, Deformation, Pin,
    UnreachablePolicy,
};
pub use falloff::{BlendWeighting, FalloffMetric};
pub use geodesic::{geodesic_distances, DistanceMatrix};
pub use idw::IdwOptions;
pub use progress::{Progress, Stage};
pub use rigid::{rigid_align, RigidTransform};
pub use rotation::proper_rotation_from_covariance;
