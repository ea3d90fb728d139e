//! Mesh and pin file I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | Polygons are fan triangulated |
//! | STL | `.stl` | ✓ | ✓ | Binary and ASCII in, binary out |
//! | PLY | `.ply` | ✓ | ✓ | ASCII out |
//!
//! Pin sets are stored as JSON, see [`pins`].
//!
//! # Usage
//!
//! ```no_run
//! use elastic_mesh::io::{load, save};
//!
//! let mesh = load("model.obj").unwrap();
//! save(&mesh, "model.ply").unwrap();
//! ```

pub mod obj;
pub mod pins;
pub mod ply;
pub mod stl;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::TriMesh;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
    /// STL (stereolithography) format.
    Stl,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            "stl" => Some(Format::Stl),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    fn require(path: &Path) -> Result<Format> {
        Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        })
    }
}

/// Load a mesh from a file, picking the format from the extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let path = path.as_ref();
    match Format::require(path)? {
        Format::Obj => obj::load(path),
        Format::Stl => stl::load(path),
        Format::Ply => ply::load(path),
    }
}

/// Save a mesh to a file, picking the format from the extension.
pub fn save<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match Format::require(path)? {
        Format::Obj => obj::save(mesh, path),
        Format::Stl => stl::save(mesh, path),
        Format::Ply => ply::save(mesh, path),
    }
}

/// Split a polygon into a triangle fan around its first vertex.
pub(crate) fn fan_triangulate(polygon: &[usize], faces: &mut Vec<[usize; 3]>) {
    for i in 1..polygon.len().saturating_sub(1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes;
    use approx::assert_relative_eq;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/mesh.OBJ"), Some(Format::Obj));
        assert_eq!(Format::from_path("mesh.stl"), Some(Format::Stl));
        assert_eq!(Format::from_path("mesh.ply"), Some(Format::Ply));
        assert_eq!(Format::from_path("mesh.glb"), None);
        assert_eq!(Format::from_path("mesh"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load("mesh.xyz").unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat { ref extension } if extension == "xyz"));
    }

    #[test]
    fn test_fan_triangulate() {
        let mut faces = Vec::new();
        fan_triangulate(&[4, 5, 6, 7, 8], &mut faces);
        assert_eq!(faces, vec![[4, 5, 6], [4, 6, 7], [4, 7, 8]]);

        faces.clear();
        fan_triangulate(&[1, 2], &mut faces);
        assert!(faces.is_empty());
    }

    #[test]
    fn test_every_format_preserves_grid() {
        let mesh = test_meshes::grid(2);
        let dir = tempfile::tempdir().unwrap();

        for name in ["grid.obj", "grid.stl", "grid.ply"] {
            let path = dir.path().join(name);
            save(&mesh, &path).unwrap();
            let loaded = load(&path).unwrap();

            assert_eq!(loaded.num_vertices(), mesh.num_vertices(), "{name}");
            assert_eq!(loaded.num_faces(), mesh.num_faces(), "{name}");
            for face in &loaded.faces {
                let matched = mesh.faces.iter().any(|f| {
                    (0..3).all(|k| {
                        let a = loaded.vertices[face[k]];
                        let b = mesh.vertices[f[k]];
                        (a - b).norm() < 1e-6
                    })
                });
                assert!(matched, "{name}: face {face:?} not found");
            }
            let (lo, hi) = loaded.bounding_box().unwrap();
            assert_relative_eq!(hi - lo, nalgebra::Vector3::new(2.0, 2.0, 0.0), epsilon = 1e-6);
        }
    }
}
