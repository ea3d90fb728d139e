//! Distance falloff and the final blend between the two deformation fields.
//!
//! Near a pin the inverse-distance field follows the pin closely; far away
//! the ARAP field keeps the surface locally rigid. Each vertex gets a blend
//! factor in `[0, 1]` from its geodesic distances to the pins: 1 means fully
//! inverse-distance, 0 fully ARAP.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::deform::Pin;
use super::geodesic::DistanceMatrix;
use super::idw::{inverse_distance_weights, IdwOptions, IdwWeights};

/// Shape of a pin's influence as a function of geodesic distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FalloffMetric {
    /// `exp(-(d / r)^2)`.
    #[default]
    Gaussian,
    /// `1 / (1 + (d / r)^power)`.
    InversePower {
        /// Exponent of the scaled distance.
        power: f64,
    },
}

impl FalloffMetric {
    /// Influence at distance `distance` for a pin of radius `radius`.
    ///
    /// Infinite distances give 0, zero distance gives 1.
    ///
    /// ```
    /// use elastic_mesh::algo::FalloffMetric;
    ///
    /// let gaussian = FalloffMetric::Gaussian;
    /// assert_eq!(gaussian.evaluate(0.0, 1.0), 1.0);
    /// assert!((gaussian.evaluate(1.0, 1.0) - (-1.0f64).exp()).abs() < 1e-12);
    /// assert_eq!(gaussian.evaluate(f64::INFINITY, 1.0), 0.0);
    /// ```
    pub fn evaluate(&self, distance: f64, radius: f64) -> f64 {
        if !distance.is_finite() {
            return 0.0;
        }
        let scaled = distance / radius;
        let value = match *self {
            FalloffMetric::Gaussian => (-scaled * scaled).exp(),
            FalloffMetric::InversePower { power } => 1.0 / (1.0 + scaled.powf(power)),
        };
        value.clamp(0.0, 1.0)
    }

    /// Whether the metric's parameters are usable.
    pub fn is_valid(&self) -> bool {
        match *self {
            FalloffMetric::Gaussian => true,
            FalloffMetric::InversePower { power } => power.is_finite() && power > 0.0,
        }
    }
}

/// How per-pin falloff values combine into one blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlendWeighting {
    /// Strongest single-pin falloff.
    #[default]
    MaxFalloff,
    /// Each pin's falloff is first scaled by its normalized inverse-distance
    /// weight; the strongest scaled value wins. Softer between pins.
    InverseDistanceScaled,
}

/// Blend factor in `[0, 1]` for every vertex.
///
/// A vertex within `idw.epsilon` of a pin always gets 1.
pub fn falloff_factors(
    distances: &DistanceMatrix,
    pins: &[Pin],
    weighting: BlendWeighting,
    idw: &IdwOptions,
) -> Vec<f64> {
    let mut column = Vec::with_capacity(pins.len());
    (0..distances.num_vertices())
        .map(|v| {
            column.clear();
            column.extend(distances.column(v));

            let falloff = |p: usize| pins[p].metric.evaluate(column[p], pins[p].radius);
            let factor = match inverse_distance_weights(&column, idw.power, idw.epsilon) {
                IdwWeights::Unreachable => 0.0,
                IdwWeights::ExactMatch(_) => 1.0,
                IdwWeights::Blend(weights) => match weighting {
                    BlendWeighting::MaxFalloff => (0..pins.len()).map(falloff).fold(0.0, f64::max),
                    BlendWeighting::InverseDistanceScaled => weights
                        .iter()
                        .enumerate()
                        .map(|(p, w)| w * falloff(p))
                        .fold(0.0, f64::max),
                },
            };
            factor.clamp(0.0, 1.0)
        })
        .collect()
}

/// `idw * factor + arap * (1 - factor)`, per vertex.
///
/// # Panics
///
/// Panics if the three slices have different lengths.
pub fn blend(idw: &[Point3<f64>], arap: &[Point3<f64>], factors: &[f64]) -> Vec<Point3<f64>> {
    assert_eq!(idw.len(), arap.len(), "field length mismatch");
    assert_eq!(idw.len(), factors.len(), "factor length mismatch");

    idw.iter()
        .zip(arap)
        .zip(factors)
        .map(|((a, b), &t)| Point3::from(a.coords * t + b.coords * (1.0 - t)))
        .collect()
}
