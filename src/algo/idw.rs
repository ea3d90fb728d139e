//! Closed-form inverse-distance deformation field.
//!
//! Every vertex is first moved by the rigid transform that best maps the pin
//! rest positions onto their targets. What the rigid transform cannot explain
//! (each pin's residual) is then spread over the mesh with inverse-distance
//! weights on the geodesic distances. The result is smooth, cheap and exact
//! at the pins, which makes it a good seed for ARAP and the near-field half of
//! the final blend.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MeshError, Result};
use crate::mesh::MeshContext;

use super::deform::Pin;
use super::geodesic::DistanceMatrix;
use super::rigid::{rigid_align, RigidTransform};

/// Options for the inverse-distance field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwOptions {
    /// Exponent applied to `distance + epsilon` in the weight denominator.
    pub power: f64,
    /// Distances below this count as an exact match with the pin.
    pub epsilon: f64,
    /// Whether to apply the best-fit rigid transform before spreading the
    /// pin residuals. Without it, the full pin displacement is interpolated.
    pub apply_rigid: bool,
}

impl Default for IdwOptions {
    fn default() -> Self {
        Self {
            power: 2.0,
            epsilon: 1e-3,
            apply_rigid: true,
        }
    }
}

impl IdwOptions {
    /// Set the weight exponent.
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    /// Set the exact-match distance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Enable or disable the rigid pre-alignment.
    pub fn with_rigid(mut self, apply_rigid: bool) -> Self {
        self.apply_rigid = apply_rigid;
        self
    }

    /// Check that the parameters are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.power.is_finite() || self.power < 0.0 {
            return Err(MeshError::invalid_param(
                "power",
                self.power,
                "must be finite and non-negative",
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(MeshError::invalid_param(
                "epsilon",
                self.epsilon,
                "must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// How the pins share influence over a single vertex.
#[derive(Debug, Clone, PartialEq)]
pub enum IdwWeights {
    /// Normalized per-pin weights summing to 1. Pins that cannot reach the
    /// vertex get weight 0.
    Blend(Vec<f64>),
    /// The vertex sits on (within epsilon of) this pin.
    ExactMatch(usize),
    /// No pin reaches the vertex.
    Unreachable,
}

/// Inverse-distance weights for one vertex, given its distance to each pin.
///
/// Weights are `1 / (d + epsilon)^power`, normalized to sum to 1. If any pin is
/// closer than `epsilon`, the nearest one wins outright.
///
/// # Example
///
/// ```
/// use elastic_mesh::algo::idw::{inverse_distance_weights, IdwWeights};
///
/// match inverse_distance_weights(&[1.0, 3.0], 2.0, 1e-3) {
///     IdwWeights::Blend(w) => {
///         assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
///         assert!(w[0] > w[1]);
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub fn inverse_distance_weights(distances: &[f64], power: f64, epsilon: f64) -> IdwWeights {
    let nearest = distances
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, d)| d.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let Some((nearest, nearest_distance)) = nearest else {
        return IdwWeights::Unreachable;
    };
    if nearest_distance < epsilon {
        return IdwWeights::ExactMatch(nearest);
    }

    let mut weights: Vec<f64> = distances
        .iter()
        .map(|&d| {
            if d.is_finite() {
                1.0 / (d + epsilon).powf(power)
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        weights.iter_mut().for_each(|w| *w /= total);
    } else {
        // Underflow for enormous distances: fall back to the nearest pin.
        return IdwWeights::ExactMatch(nearest);
    }
    IdwWeights::Blend(weights)
}

/// Output of [`inverse_distance_field`].
#[derive(Debug, Clone)]
pub struct IdwField {
    /// Displaced position of every vertex.
    pub positions: Vec<Point3<f64>>,
    /// Rigid transform applied before the residual correction.
    pub rigid: RigidTransform,
}

/// Compute the inverse-distance deformation of every vertex.
///
/// Vertices that no pin reaches keep their rest position.
pub fn inverse_distance_field(
    ctx: &MeshContext<'_>,
    pins: &[Pin],
    distances: &DistanceMatrix,
    options: &IdwOptions,
) -> Result<IdwField> {
    options.validate()?;

    let rest = ctx.vertices();
    let rigid = if options.apply_rigid {
        let rest_pins: Vec<Point3<f64>> = pins.iter().map(|p| rest[p.vertex]).collect();
        let targets: Vec<Point3<f64>> = pins.iter().map(|p| p.target).collect();
        rigid_align(&rest_pins, &targets)?
    } else {
        RigidTransform::identity()
    };

    let residuals: Vec<Vector3<f64>> = pins
        .iter()
        .map(|p| p.target - rigid.transform_point(&rest[p.vertex]))
        .collect();

    let mut column = Vec::with_capacity(pins.len());
    let mut exact = 0usize;
    let positions = (0..ctx.num_vertices())
        .map(|v| {
            column.clear();
            column.extend(distances.column(v));
            let moved = rigid.transform_point(&rest[v]);
            match inverse_distance_weights(&column, options.power, options.epsilon) {
                IdwWeights::Blend(weights) => {
                    let offset = weights
                        .iter()
                        .zip(&residuals)
                        .fold(Vector3::zeros(), |acc, (w, r)| acc + r * *w);
                    moved + offset
                }
                IdwWeights::ExactMatch(pin) => {
                    exact += 1;
                    moved + residuals[pin]
                }
                IdwWeights::Unreachable => rest[v],
            }
        })
        .collect();

    debug!(
        exact_matches = exact,
        rigid_translation = ?rigid.translation.as_slice(),
        "computed inverse-distance field"
    );

    Ok(IdwField { positions, rigid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::geodesic::geodesic_distances;
    use crate::test_meshes;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    fn pin_vertices(pins: &[Pin]) -> Vec<usize> {
        pins.iter().map(|p| p.vertex).collect()
    }

    #[test]
    fn test_weights_partition_of_unity() {
        let cases: [&[f64]; 4] = [
            &[1.0],
            &[0.5, 2.0, 7.0],
            &[3.0, f64::INFINITY, 1.0],
            &[0.01, 0.01, 0.01, 0.01],
        ];
        for distances in cases {
            match inverse_distance_weights(distances, 2.0, 1e-3) {
                IdwWeights::Blend(w) => {
                    assert_eq!(w.len(), distances.len());
                    assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
                    assert!(w.iter().all(|&x| (0.0..=1.0).contains(&x)));
                }
                other => panic!("expected blend weights, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_weights_unreachable_pin_gets_zero() {
        let IdwWeights::Blend(w) = inverse_distance_weights(&[2.0, f64::INFINITY], 2.0, 1e-3)
        else {
            panic!("expected blend weights");
        };
        assert_eq!(w[1], 0.0);
        assert_relative_eq!(w[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_exact_match_picks_nearest() {
        assert_eq!(
            inverse_distance_weights(&[0.5, 0.0005, 0.0001], 2.0, 1e-3),
            IdwWeights::ExactMatch(2)
        );
        assert_eq!(
            inverse_distance_weights(&[0.0], 2.0, 1e-3),
            IdwWeights::ExactMatch(0)
        );
    }

    #[test]
    fn test_weights_all_unreachable() {
        assert_eq!(
            inverse_distance_weights(&[f64::INFINITY, f64::INFINITY], 2.0, 1e-3),
            IdwWeights::Unreachable
        );
        assert_eq!(inverse_distance_weights(&[], 2.0, 1e-3), IdwWeights::Unreachable);
    }

    #[test]
    fn test_field_exact_at_pins() {
        let mesh = test_meshes::grid(4);
        let ctx = mesh.context().unwrap();
        let pins = vec![
            Pin::new(0, Point3::new(0.0, 0.0, 0.5)),
            Pin::new(12, Point3::new(2.0, 3.0, -0.2)),
            Pin::new(24, Point3::new(4.5, 4.0, 0.0)),
        ];
        let distances = geodesic_distances(&ctx, &pin_vertices(&pins), false);

        let field = inverse_distance_field(&ctx, &pins, &distances, &IdwOptions::default()).unwrap();
        for pin in &pins {
            assert_relative_eq!(field.positions[pin.vertex], pin.target, epsilon = 1e-10);
        }
        assert!(field
            .positions
            .iter()
            .all(|p| p.coords.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn test_field_rigid_motion_is_reproduced() {
        let mesh = test_meshes::octahedron();
        let ctx = mesh.context().unwrap();
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.6);
        let offset = Vector3::new(0.3, -1.0, 2.0);
        let pins: Vec<Pin> = [0, 2, 4]
            .iter()
            .map(|&v| Pin::new(v, rotation * mesh.vertices[v] + offset))
            .collect();
        let distances = geodesic_distances(&ctx, &pin_vertices(&pins), false);

        let field = inverse_distance_field(&ctx, &pins, &distances, &IdwOptions::default()).unwrap();
        assert_relative_eq!(field.rigid.rotation, *rotation.matrix(), epsilon = 1e-9);
        for (rest, moved) in mesh.vertices.iter().zip(&field.positions) {
            assert_relative_eq!(*moved, rotation * *rest + offset, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_field_without_rigid_interpolates_displacement() {
        let mesh = test_meshes::single_triangle();
        let ctx = mesh.context().unwrap();
        let shift = Vector3::new(0.0, 0.0, 1.0);
        let pins = vec![Pin::new(0, mesh.vertices[0] + shift)];
        let distances = geodesic_distances(&ctx, &[0], false);

        let options = IdwOptions::default().with_rigid(false);
        let field = inverse_distance_field(&ctx, &pins, &distances, &options).unwrap();
        assert_eq!(field.rigid, RigidTransform::identity());
        // A single pin owns all the weight everywhere it reaches.
        for (rest, moved) in mesh.vertices.iter().zip(&field.positions) {
            assert_relative_eq!(*moved, *rest + shift, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_field_unreachable_keeps_rest() {
        let mesh = test_meshes::disjoint_triangles();
        let ctx = mesh.context().unwrap();
        let pins = vec![Pin::new(0, Point3::new(5.0, 5.0, 5.0))];
        let distances = geodesic_distances(&ctx, &[0], false);

        let field = inverse_distance_field(&ctx, &pins, &distances, &IdwOptions::default()).unwrap();
        for v in 3..6 {
            assert_eq!(field.positions[v], mesh.vertices[v]);
        }
        assert_relative_eq!(field.positions[0], pins[0].target, epsilon = 1e-12);
    }

    #[test]
    fn test_options_validation() {
        assert!(IdwOptions::default().validate().is_ok());
        assert!(IdwOptions::default().with_power(-1.0).validate().is_err());
        assert!(IdwOptions::default().with_epsilon(0.0).validate().is_err());
        assert!(IdwOptions::default().with_epsilon(f64::NAN).validate().is_err());
    }
}
