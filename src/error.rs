//! Error types for elastic-mesh.
//!
//! Structural problems (bad indices, unanchored vertices, singular systems)
//! abort a deformation with one of these errors. Geometry-local anomalies such
//! as zero-area triangles or reflected rotation fits are repaired in place and
//! only show up in the logs.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while preparing or deforming a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no vertices.
    #[error("mesh has no vertices")]
    NoVertices,

    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A pin references a vertex outside the mesh.
    #[error("pin {pin} references invalid vertex index {vertex}")]
    InvalidPin {
        /// Position of the pin in the pin list.
        pin: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// The same vertex was pinned more than once.
    #[error("vertex {vertex} is pinned more than once")]
    DuplicatePin {
        /// The repeated vertex index.
        vertex: usize,
    },

    /// No pins were supplied, so nothing anchors the deformation.
    #[error("deformation requires at least one pin")]
    NoPins,

    /// A vertex cannot be reached from any pin along mesh edges.
    #[error("vertex {vertex} is not reachable from any pin")]
    UnreachableVertex {
        /// The unreachable vertex.
        vertex: usize,
    },

    /// The global linear system is singular or not positive definite.
    #[error("degenerate constraint at vertex {vertex}: {reason}")]
    DegenerateConstraint {
        /// A vertex of the offending block of the system.
        vertex: usize,
        /// What made the system degenerate.
        reason: &'static str,
    },

    /// Algorithm failed to converge.
    #[error("algorithm failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// A pin file could not be parsed or written.
    #[error("pin file error: {0}")]
    PinFile(#[from] serde_json::Error),
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Whether this error describes malformed mesh input.
    pub fn is_invalid_mesh(&self) -> bool {
        matches!(
            self,
            MeshError::NoVertices | MeshError::EmptyMesh | MeshError::InvalidVertexIndex { .. }
        )
    }
}
