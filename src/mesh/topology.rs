//! Compressed vertex adjacency.
//!
//! Neighbor lists are stored back to back in one flat array, with
//! `offsets[v]..offsets[v + 1]` delimiting the run that belongs to vertex `v`.
//! Each run is sorted ascending and free of duplicates, so the position of the
//! pair `(i, j)` in the flat array (its *slot*) can be found by binary search
//! and used to index any per-edge array laid out the same way.

use std::collections::VecDeque;
use std::ops::Range;

use crate::error::{MeshError, Result};

/// Symmetric vertex adjacency derived from triangle faces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjacency {
    /// Start of each vertex's neighbor run. Length is `num_vertices + 1`.
    offsets: Vec<usize>,
    /// Neighbor indices for all vertices, concatenated.
    neighbors: Vec<usize>,
}

impl Adjacency {
    /// Build the adjacency of `num_vertices` vertices from triangle faces.
    ///
    /// Every pair of distinct vertices sharing a triangle becomes mutual
    /// neighbors. Repeated indices inside a face contribute no self-loops.
    /// Vertices that appear in no face end up with an empty neighbor run.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidVertexIndex`] if a face index is out of range.
    pub fn from_faces(num_vertices: usize, faces: &[[usize; 3]]) -> Result<Self> {
        let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(faces.len() * 6);

        for (fi, face) in faces.iter().enumerate() {
            for &vi in face {
                if vi >= num_vertices {
                    return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
                }
            }
            for k in 0..3 {
                let a = face[k];
                let b = face[(k + 1) % 3];
                if a != b {
                    pairs.push((a, b));
                    pairs.push((b, a));
                }
            }
        }

        pairs.sort_unstable();
        pairs.dedup();

        let mut offsets = vec![0usize; num_vertices + 1];
        for &(a, _) in &pairs {
            offsets[a + 1] += 1;
        }
        for v in 0..num_vertices {
            offsets[v + 1] += offsets[v];
        }

        let neighbors = pairs.into_iter().map(|(_, b)| b).collect();

        Ok(Self { offsets, neighbors })
    }

    /// Number of vertices covered by this adjacency.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of directed edges (twice the number of undirected edges).
    #[inline]
    pub fn num_directed_edges(&self) -> usize {
        self.neighbors.len()
    }

    /// Sorted neighbors of vertex `v`.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.neighbors[self.edge_slots(v)]
    }

    /// Slot range of vertex `v` in the flat neighbor array.
    #[inline]
    pub fn edge_slots(&self, v: usize) -> Range<usize> {
        self.offsets[v]..self.offsets[v + 1]
    }

    /// Number of neighbors of vertex `v`.
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    /// Slot of the directed edge `(i, j)`, if the two vertices are adjacent.
    pub fn slot(&self, i: usize, j: usize) -> Option<usize> {
        let start = self.offsets[i];
        self.neighbors(i)
            .binary_search(&j)
            .ok()
            .map(|local| start + local)
    }

    /// Check whether `i` and `j` share an edge.
    #[inline]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.slot(i, j).is_some()
    }

    /// Label connected components with breadth-first search.
    ///
    /// Returns one label per vertex and the number of components. Labels are
    /// assigned in order of the lowest vertex index in each component.
    pub fn connected_components(&self) -> (Vec<usize>, usize) {
        let n = self.num_vertices();
        let mut labels = vec![usize::MAX; n];
        let mut count = 0;
        let mut queue = VecDeque::new();

        for seed in 0..n {
            if labels[seed] != usize::MAX {
                continue;
            }
            labels[seed] = count;
            queue.push_back(seed);

            while let Some(v) = queue.pop_front() {
                for &u in self.neighbors(v) {
                    if labels[u] == usize::MAX {
                        labels[u] = count;
                        queue.push_back(u);
                    }
                }
            }

            count += 1;
        }

        (labels, count)
    }
}
