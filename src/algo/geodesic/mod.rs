//! Geodesic distance computation on meshes.
//!
//! Distances here are shortest paths along mesh edges, with each edge weighted
//! by its Euclidean length. They approximate the intrinsic surface distance
//! and are what the deformation uses to decide how strongly each pin
//! influences each vertex.
//!
//! # Example
//!
//! ```
//! use elastic_mesh::algo::geodesic::geodesic_distances;
//! use elastic_mesh::mesh::MeshContext;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//! let ctx = MeshContext::new(&vertices, &faces).unwrap();
//!
//! let matrix = geodesic_distances(&ctx, &[0, 1], false);
//! assert_eq!(matrix.get(0, 0), 0.0);
//! assert!((matrix.get(1, 0) - 1.0).abs() < 1e-12);
//! ```

mod dijkstra;

use rayon::prelude::*;
use tracing::debug;

pub use dijkstra::{dijkstra, dijkstra_multiple, DijkstraOptions};

use crate::mesh::MeshContext;

/// Result of a shortest-path computation from one or more sources.
#[derive(Debug, Clone)]
pub struct GeodesicResult {
    /// Distance from the source(s) to each vertex.
    /// `f64::INFINITY` if the vertex is unreachable.
    distances: Vec<f64>,

    /// Predecessor vertex for each vertex, if requested.
    predecessors: Option<Vec<Option<usize>>>,
}

impl GeodesicResult {
    pub(crate) fn new(distances: Vec<f64>, predecessors: Option<Vec<Option<usize>>>) -> Self {
        Self {
            distances,
            predecessors,
        }
    }

    /// Distance to vertex `v`, `f64::INFINITY` if unreachable.
    #[inline]
    pub fn distance(&self, v: usize) -> f64 {
        self.distances[v]
    }

    /// All distances as a slice.
    #[inline]
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Consume the result and return the distance vector.
    pub fn into_distances(self) -> Vec<f64> {
        self.distances
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Vertex with the maximum finite distance, if any vertex is reachable.
    pub fn farthest_vertex(&self) -> Option<(usize, f64)> {
        self.distances
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Reconstruct the shortest path from a source to `target`.
    ///
    /// Returns `None` if predecessors weren't stored or `target` is
    /// unreachable. The path includes both endpoints.
    pub fn path_to(&self, target: usize) -> Option<Vec<usize>> {
        let predecessors = self.predecessors.as_ref()?;

        if !self.distances[target].is_finite() {
            return None;
        }

        let mut path = vec![target];
        let mut current = target;
        while let Some(pred) = predecessors[current] {
            path.push(pred);
            current = pred;
            if path.len() > self.distances.len() {
                return None;
            }
        }

        path.reverse();
        Some(path)
    }

    /// Check if vertex `v` is reachable from the source(s).
    #[inline]
    pub fn is_reachable(&self, v: usize) -> bool {
        self.distances[v].is_finite()
    }

    /// Count the number of reachable vertices.
    pub fn reachable_count(&self) -> usize {
        self.distances.iter().filter(|d| d.is_finite()).count()
    }
}

/// Pins × vertices matrix of edge-path distances, stored row-major.
///
/// Row `p` holds the distances from the `p`-th pin to every vertex. Entries
/// for vertices that no path connects to the pin are `f64::INFINITY`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    num_pins: usize,
    num_vertices: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Build a matrix from per-pin distance rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows have different lengths.
    pub fn from_rows(rows: Vec<Vec<f64>>, num_vertices: usize) -> Self {
        let num_pins = rows.len();
        let mut data = Vec::with_capacity(num_pins * num_vertices);
        for row in rows {
            assert_eq!(row.len(), num_vertices, "distance row length mismatch");
            data.extend(row);
        }
        Self {
            num_pins,
            num_vertices,
            data,
        }
    }

    /// Number of pins (rows).
    #[inline]
    pub fn num_pins(&self) -> usize {
        self.num_pins
    }

    /// Number of vertices (columns).
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Distance from pin `pin` to vertex `v`.
    #[inline]
    pub fn get(&self, pin: usize, v: usize) -> f64 {
        self.data[pin * self.num_vertices + v]
    }

    /// Overwrite the distance from pin `pin` to vertex `v`.
    #[inline]
    pub fn set(&mut self, pin: usize, v: usize, distance: f64) {
        self.data[pin * self.num_vertices + v] = distance;
    }

    /// Distances from pin `pin` to all vertices.
    #[inline]
    pub fn row(&self, pin: usize) -> &[f64] {
        let start = pin * self.num_vertices;
        &self.data[start..start + self.num_vertices]
    }

    /// Distances from every pin to vertex `v`, in pin order.
    pub fn column(&self, v: usize) -> impl ExactSizeIterator<Item = f64> + '_ {
        (0..self.num_pins).map(move |p| self.get(p, v))
    }

    /// Copy of column `v`.
    pub fn column_vec(&self, v: usize) -> Vec<f64> {
        self.column(v).collect()
    }

    /// Whether no pin reaches vertex `v`.
    pub fn is_unreachable(&self, v: usize) -> bool {
        self.column(v).all(|d| d.is_infinite())
    }

    /// Vertices that no pin reaches, in ascending order.
    pub fn unreachable_vertices(&self) -> Vec<usize> {
        (0..self.num_vertices)
            .filter(|&v| self.is_unreachable(v))
            .collect()
    }

    /// Pin with the smallest distance to vertex `v`, if any pin reaches it.
    pub fn nearest_pin(&self, v: usize) -> Option<(usize, f64)> {
        self.column(v)
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Run one single-source shortest path per pin vertex.
///
/// With `parallel` set, pins are processed on the rayon thread pool.
pub fn geodesic_distances(ctx: &MeshContext<'_>, pins: &[usize], parallel: bool) -> DistanceMatrix {
    let options = DijkstraOptions::default();
    let run = |&pin: &usize| {
        dijkstra(ctx.adjacency(), ctx.vertices(), pin, &options).into_distances()
    };

    let rows: Vec<Vec<f64>> = if parallel {
        pins.par_iter().map(run).collect()
    } else {
        pins.iter().map(run).collect()
    };

    debug!(pins = pins.len(), vertices = ctx.num_vertices(), "computed geodesic distance matrix");

    DistanceMatrix::from_rows(rows, ctx.num_vertices())
}
