//! STL (stereolithography) format support.
//!
//! STL stores every triangle with its own copy of the corner positions.
//! Loading merges bit-identical corners back into shared vertices, which is
//! what the deformation needs to see a connected surface.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::mesh::TriMesh;

/// Load a mesh from an STL file (binary or ASCII).
///
/// Triangles that collapse onto fewer than three distinct vertices are
/// dropped.
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let stl = stl_io::read_stl(&mut file).map_err(|e| MeshError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(stl.vertices.len());
    let mut index_of: HashMap<[u32; 3], usize> = HashMap::with_capacity(stl.vertices.len());
    let remap: Vec<usize> = stl
        .vertices
        .iter()
        .map(|v| {
            let key = [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()];
            *index_of.entry(key).or_insert_with(|| {
                vertices.push(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64));
                vertices.len() - 1
            })
        })
        .collect();

    let faces: Vec<[usize; 3]> = stl
        .faces
        .iter()
        .map(|tri| tri.vertices.map(|i| remap[i]))
        .filter(|[a, b, c]| a != b && b != c && a != c)
        .collect();

    if faces.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "STL file contains no valid triangles".to_string(),
        });
    }

    Ok(TriMesh::new(vertices, faces))
}

/// Save a mesh to a binary STL file.
///
/// Positions are narrowed to `f32`, the only precision STL supports.
pub fn save<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let vertex = |p: &Point3<f64>| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);
    let triangles: Vec<stl_io::Triangle> = mesh
        .faces
        .iter()
        .map(|f| {
            let [p0, p1, p2] = f.map(|i| mesh.vertices[i]);
            let n = (p1 - p0)
                .cross(&(p2 - p0))
                .try_normalize(f64::MIN_POSITIVE)
                .unwrap_or_else(Vector3::zeros);

            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [vertex(&p0), vertex(&p1), vertex(&p2)],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(())
}
