//! Dijkstra's algorithm for geodesic distances.
//!
//! Computes shortest path distances along mesh edges, weighting each edge by
//! its Euclidean length. This is exact on the edge graph and approximates the
//! true surface distance.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::Point3;

use crate::mesh::Adjacency;

use super::GeodesicResult;

/// Options for Dijkstra's algorithm.
#[derive(Debug, Clone, Default)]
pub struct DijkstraOptions {
    /// Whether to store predecessor information for path reconstruction.
    pub store_predecessors: bool,

    /// Maximum distance to explore. Vertices beyond this distance won't be visited.
    /// Set to `None` for no limit.
    pub max_distance: Option<f64>,

    /// Target vertex for early termination.
    /// If set, the algorithm stops once this vertex is settled.
    pub target: Option<usize>,
}

impl DijkstraOptions {
    /// Enable predecessor storage for path reconstruction.
    pub fn with_predecessors(mut self, store: bool) -> Self {
        self.store_predecessors = store;
        self
    }

    /// Set maximum distance to explore.
    pub fn with_max_distance(mut self, max_dist: f64) -> Self {
        self.max_distance = Some(max_dist);
        self
    }

    /// Set target vertex for early termination.
    pub fn with_target(mut self, target: usize) -> Self {
        self.target = Some(target);
        self
    }
}

/// Entry in Dijkstra's priority queue.
#[derive(Debug, Clone)]
struct DijkstraEntry {
    vertex: usize,
    distance: f64,
}

// Reverse ordering so that `BinaryHeap` pops the smallest distance first.
impl PartialEq for DijkstraEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for DijkstraEntry {}

impl PartialOrd for DijkstraEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DijkstraEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.distance.total_cmp(&self.distance)
    }
}

/// Compute edge-path distances from a single source vertex.
///
/// # Example
///
/// ```
/// use elastic_mesh::algo::geodesic::{dijkstra, DijkstraOptions};
/// use elastic_mesh::mesh::Adjacency;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let adjacency = Adjacency::from_faces(3, &[[0, 1, 2]]).unwrap();
///
/// let result = dijkstra(&adjacency, &vertices, 0, &DijkstraOptions::default());
/// assert!((result.distance(1) - 1.0).abs() < 1e-12);
/// ```
pub fn dijkstra(
    adjacency: &Adjacency,
    vertices: &[Point3<f64>],
    source: usize,
    options: &DijkstraOptions,
) -> GeodesicResult {
    dijkstra_multiple(adjacency, vertices, &[source], options)
}

/// Compute edge-path distances from the nearest of several source vertices.
///
/// All sources start at distance 0. Sources outside the mesh are ignored.
pub fn dijkstra_multiple(
    adjacency: &Adjacency,
    vertices: &[Point3<f64>],
    sources: &[usize],
    options: &DijkstraOptions,
) -> GeodesicResult {
    let n = adjacency.num_vertices();

    if n == 0 || sources.is_empty() {
        return GeodesicResult::new(vec![f64::INFINITY; n], None);
    }

    let mut distances = vec![f64::INFINITY; n];
    let mut predecessors: Option<Vec<Option<usize>>> = if options.store_predecessors {
        Some(vec![None; n])
    } else {
        None
    };

    let mut heap = BinaryHeap::new();

    for &source in sources {
        if source < n {
            distances[source] = 0.0;
            heap.push(DijkstraEntry {
                vertex: source,
                distance: 0.0,
            });
        }
    }

    while let Some(DijkstraEntry { vertex: u, distance: dist_u }) = heap.pop() {
        // Stale entry: a shorter path was already settled.
        if dist_u > distances[u] {
            continue;
        }

        if options.target == Some(u) {
            break;
        }

        if let Some(max_dist) = options.max_distance {
            if dist_u > max_dist {
                continue;
            }
        }

        for &v in adjacency.neighbors(u) {
            let new_dist = dist_u + (vertices[v] - vertices[u]).norm();

            if new_dist < distances[v] {
                distances[v] = new_dist;
                if let Some(ref mut preds) = predecessors {
                    preds[v] = Some(u);
                }
                heap.push(DijkstraEntry {
                    vertex: v,
                    distance: new_dist,
                });
            }
        }
    }

    GeodesicResult::new(distances, predecessors)
}
