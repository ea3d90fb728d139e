//! Wavefront OBJ format support.
//!
//! Only geometry is read: `v` records and `f` records. Texture coordinates,
//! normals, groups and materials are skipped. Vertices keep their file order
//! so that pin files can refer to OBJ vertex numbers (zero-based).

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::TriMesh;

use super::fan_triangulate;

/// Load a mesh from an OBJ file.
///
/// # Example
///
/// ```no_run
/// use elastic_mesh::io::obj;
///
/// let mesh = obj::load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read(BufReader::new(file)).map_err(|err| match err {
        MeshError::LoadError { message, .. } => MeshError::LoadError {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Parse OBJ text. Errors carry an empty path.
pub fn read<R: BufRead>(reader: R) -> Result<TriMesh> {
    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();
    let mut polygon: Vec<usize> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let mut coords = [0.0; 3];
                for c in &mut coords {
                    *c = tokens
                        .next()
                        .and_then(|t| t.parse::<f64>().ok())
                        .ok_or_else(|| parse_error(line_no, "malformed vertex"))?;
                }
                vertices.push(Point3::from(coords));
            }
            Some("f") => {
                polygon.clear();
                for token in tokens {
                    polygon.push(resolve_index(token, vertices.len(), line_no)?);
                }
                if polygon.len() < 3 {
                    return Err(parse_error(line_no, "face with fewer than three vertices"));
                }
                fan_triangulate(&polygon, &mut faces);
            }
            _ => {}
        }
    }

    if faces.is_empty() {
        return Err(MeshError::LoadError {
            path: Default::default(),
            message: "OBJ file contains no faces".to_string(),
        });
    }

    Ok(TriMesh::new(vertices, faces))
}

/// Resolve a face token (`7`, `7/1`, `7//3`, `-1`) to a zero-based index.
fn resolve_index(token: &str, num_vertices: usize, line_no: usize) -> Result<usize> {
    let raw = token.split('/').next().unwrap_or(token);
    let index: i64 = raw
        .parse()
        .map_err(|_| parse_error(line_no, "malformed face index"))?;

    let resolved = match index {
        i if i > 0 => (i - 1) as usize,
        i if i < 0 => {
            let back = i.unsigned_abs() as usize;
            if back > num_vertices {
                return Err(parse_error(line_no, "relative face index out of range"));
            }
            num_vertices - back
        }
        _ => return Err(parse_error(line_no, "face index 0 is invalid")),
    };
    Ok(resolved)
}

fn parse_error(line_no: usize, what: &str) -> MeshError {
    MeshError::LoadError {
        path: Default::default(),
        message: format!("line {}: {}", line_no + 1, what),
    }
}

/// Save a mesh to an OBJ file.
pub fn save<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a mesh as OBJ text.
pub fn write<W: Write>(mesh: &TriMesh, writer: &mut W) -> Result<()> {
    writeln!(writer, "# Generated by elastic-mesh")?;
    for v in &mesh.vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for f in &mesh.faces {
        writeln!(writer, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }
    Ok(())
}
