//! Cotangent edge weights.
//!
//! For every triangle and every corner of it, half the cotangent of the corner
//! angle is added to both directed entries of the opposite edge. An interior
//! edge therefore ends up with `(cot α + cot β) / 2`, a boundary edge with a
//! single `cot α / 2`.

use nalgebra::Point3;
use tracing::{debug, warn};

use super::Adjacency;

/// Below this `sin(angle)` a corner is treated as degenerate.
const MIN_SIN_ANGLE: f64 = 1e-8;

/// Below this product of edge lengths a corner is treated as degenerate.
const MIN_EDGE_PRODUCT: f64 = 1e-20;

/// Cotangent weights laid out in parallel with [`Adjacency::neighbors`].
#[derive(Debug, Clone, PartialEq)]
pub struct CotangentWeights {
    /// One weight per directed adjacency slot.
    weights: Vec<f64>,
    /// Number of triangle corners whose contribution was replaced by zero.
    degenerate_corners: usize,
}

impl CotangentWeights {
    /// Compute cotangent weights for all directed edges of `adjacency`.
    ///
    /// Corners with a zero-length edge, or whose angle is numerically 0 or π,
    /// contribute a weight of zero instead of a non-finite value.
    pub fn compute(
        vertices: &[Point3<f64>],
        faces: &[[usize; 3]],
        adjacency: &Adjacency,
    ) -> Self {
        let mut weights = vec![0.0; adjacency.num_directed_edges()];
        let mut degenerate_corners = 0;

        for (fi, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let apex = face[k];
                let i1 = face[(k + 1) % 3];
                let i2 = face[(k + 2) % 3];

                let half_cot = match half_cotangent(&vertices[apex], &vertices[i1], &vertices[i2]) {
                    Some(w) => w,
                    None => {
                        degenerate_corners += 1;
                        debug!(face = fi, corner = apex, "degenerate triangle corner, using zero weight");
                        continue;
                    }
                };

                if let (Some(s12), Some(s21)) = (adjacency.slot(i1, i2), adjacency.slot(i2, i1)) {
                    weights[s12] += half_cot;
                    weights[s21] += half_cot;
                }
            }
        }

        if degenerate_corners > 0 {
            warn!(
                degenerate_corners,
                "mesh has degenerate triangles; their cotangent weights were set to zero"
            );
        }

        Self {
            weights,
            degenerate_corners,
        }
    }

    /// Weight of the directed edge `(i, j)`, or zero if the vertices are not adjacent.
    pub fn weight(&self, adjacency: &Adjacency, i: usize, j: usize) -> f64 {
        adjacency.slot(i, j).map_or(0.0, |s| self.weights[s])
    }

    /// Weights of the edges leaving `v`, parallel to `adjacency.neighbors(v)`.
    #[inline]
    pub fn weights_of(&self, adjacency: &Adjacency, v: usize) -> &[f64] {
        &self.weights[adjacency.edge_slots(v)]
    }

    /// All weights, indexed by adjacency slot.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    /// Number of triangle corners that were replaced by a zero weight.
    #[inline]
    pub fn degenerate_corners(&self) -> usize {
        self.degenerate_corners
    }
}

/// Half the cotangent of the angle at `apex` in triangle (`apex`, `b`, `c`).
///
/// Uses the clamped arccos of the normalized dot product. Returns `None` for
/// degenerate corners.
fn half_cotangent(apex: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<f64> {
    let e1 = b - apex;
    let e2 = c - apex;

    let len_product = e1.norm() * e2.norm();
    if len_product < MIN_EDGE_PRODUCT {
        return None;
    }

    let cos_angle = (e1.dot(&e2) / len_product).clamp(-1.0, 1.0);
    let angle = cos_angle.acos();
    if angle.sin() < MIN_SIN_ANGLE {
        return None;
    }

    let w = 0.5 / angle.tan();
    w.is_finite().then_some(w)
}
