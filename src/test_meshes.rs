//! Small meshes shared by the unit tests.

use nalgebra::Point3;

use crate::mesh::TriMesh;

/// One triangle in the XY plane.
pub fn single_triangle() -> TriMesh {
    TriMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ],
        vec![[0, 1, 2]],
    )
}

/// Unit square split along the 0-2 diagonal.
pub fn flat_quad() -> TriMesh {
    TriMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [0, 2, 3]],
    )
}

/// Regular grid of `n x n` cells in the XY plane with unit spacing.
pub fn grid(n: usize) -> TriMesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(2 * n * n);

    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64, j as f64, 0.0));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    TriMesh::new(vertices, faces)
}

/// Regular octahedron with unit circumradius, centered at the origin.
pub fn octahedron() -> TriMesh {
    TriMesh::new(
        vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, -1.0),
        ],
        vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ],
    )
}

/// Two triangles with no shared vertex: 0-2 and 3-5.
pub fn disjoint_triangles() -> TriMesh {
    TriMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.5, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [3, 4, 5]],
    )
}

/// A healthy triangle sharing edge 0-1 with a colinear (zero-area) triangle.
pub fn degenerate_sliver() -> TriMesh {
    TriMesh::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ],
        vec![[0, 1, 2], [0, 3, 1]],
    )
}

/// Length of every undirected face edge, keyed by the face-edge order.
pub fn edge_lengths(mesh: &TriMesh, positions: &[Point3<f64>]) -> Vec<f64> {
    let mut lengths = Vec::with_capacity(mesh.faces.len() * 3);
    for face in &mesh.faces {
        for k in 0..3 {
            lengths.push((positions[face[(k + 1) % 3]] - positions[face[k]]).norm());
        }
    }
    lengths
}
