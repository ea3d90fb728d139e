//! PLY (Stanford polygon) format support.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{MeshError, Result};
use crate::mesh::TriMesh;

use super::fan_triangulate;

/// Load a mesh from a PLY file (ASCII or binary).
///
/// # Example
///
/// ```no_run
/// use elastic_mesh::io::ply;
///
/// let mesh = ply::load("scan.ply").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let load_error = |message: &str| MeshError::LoadError {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| load_error(&e.to_string()))?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| load_error("PLY file has no vertex element"))?;

    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let mut coords = [0.0; 3];
        for (c, name) in coords.iter_mut().zip(["x", "y", "z"]) {
            *c = get_float_property(vertex, name)
                .ok_or_else(|| load_error(&format!("vertex missing {name} coordinate")))?;
        }
        vertices.push(Point3::from(coords));
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or_else(|| load_error("PLY file has no face element"))?;

    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(face_element.len());
    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or_else(|| load_error("face missing vertex_indices property"))?;
        fan_triangulate(&indices, &mut faces);
    }

    if faces.is_empty() {
        return Err(load_error("PLY file contains no faces"));
    }

    Ok(TriMesh::new(vertices, faces))
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh to an ASCII PLY file with double-precision positions.
pub fn save<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by elastic-mesh")?;
    writeln!(writer, "element vertex {}", mesh.num_vertices())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    writeln!(writer, "element face {}", mesh.num_faces())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for v in &mesh.vertices {
        writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
    }
    for f in &mesh.faces {
        writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
    }

    writer.flush()?;
    Ok(())
}
