//! Pin constraints.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::algo::falloff::FalloffMetric;
use crate::error::{MeshError, Result};

fn default_radius() -> f64 {
    1.0
}

/// A vertex dragged to a target position.
///
/// Serialized as `{ "vertex": 3, "target": [x, y, z], "radius": 1.0,
/// "metric": "gaussian" }`; `radius` and `metric` may be omitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Index of the pinned vertex.
    pub vertex: usize,
    /// Where the vertex must end up.
    pub target: Point3<f64>,
    /// Geodesic distance over which the pin's rigid influence fades.
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// Shape of the fade.
    #[serde(default)]
    pub metric: FalloffMetric,
}

impl Pin {
    /// Pin `vertex` to `target` with the default radius and metric.
    pub fn new(vertex: usize, target: Point3<f64>) -> Self {
        Self {
            vertex,
            target,
            radius: default_radius(),
            metric: FalloffMetric::default(),
        }
    }

    /// Set the influence radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Set the falloff metric.
    pub fn with_metric(mut self, metric: FalloffMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Check the pin against a mesh with `num_vertices` vertices. `index` is
    /// the pin's position in its list, used in error reports.
    pub fn validate(&self, index: usize, num_vertices: usize) -> Result<()> {
        if self.vertex >= num_vertices {
            return Err(MeshError::InvalidPin {
                pin: index,
                vertex: self.vertex,
            });
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(MeshError::invalid_param(
                "radius",
                self.radius,
                "must be finite and positive",
            ));
        }
        if !self.target.coords.iter().all(|c| c.is_finite()) {
            return Err(MeshError::invalid_param(
                "target",
                format!("{:?}", self.target.coords.as_slice()),
                "must be finite",
            ));
        }
        if !self.metric.is_valid() {
            return Err(MeshError::invalid_param(
                "metric",
                format!("{:?}", self.metric),
                "power must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// Validate a whole pin set: non-empty, each pin valid, no vertex pinned twice.
pub fn validate_pins(pins: &[Pin], num_vertices: usize) -> Result<()> {
    if pins.is_empty() {
        return Err(MeshError::NoPins);
    }
    let mut seen = vec![false; num_vertices];
    for (i, pin) in pins.iter().enumerate() {
        pin.validate(i, num_vertices)?;
        if std::mem::replace(&mut seen[pin.vertex], true) {
            return Err(MeshError::DuplicatePin { vertex: pin.vertex });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let pin = Pin::new(2, Point3::new(1.0, 2.0, 3.0))
            .with_radius(0.5)
            .with_metric(FalloffMetric::InversePower { power: 2.0 });
        assert_eq!(pin.vertex, 2);
        assert_eq!(pin.radius, 0.5);
        assert_eq!(pin.metric, FalloffMetric::InversePower { power: 2.0 });
    }

    #[test]
    fn test_json_defaults() {
        let pin: Pin = serde_json::from_str(r#"{ "vertex": 3, "target": [1.0, 0.0, -2.0] }"#).unwrap();
        assert_eq!(pin, Pin::new(3, Point3::new(1.0, 0.0, -2.0)));
    }

    #[test]
    fn test_json_round_trip() {
        let pin = Pin::new(7, Point3::new(0.5, 0.25, 0.0))
            .with_metric(FalloffMetric::InversePower { power: 3.0 });
        let json = serde_json::to_string(&pin).unwrap();
        assert_eq!(serde_json::from_str::<Pin>(&json).unwrap(), pin);
    }

    #[test]
    fn test_validation() {
        let ok = Pin::new(0, Point3::origin());
        assert!(validate_pins(&[ok], 3).is_ok());

        assert!(matches!(validate_pins(&[], 3), Err(MeshError::NoPins)));
        assert!(matches!(
            validate_pins(&[ok, Pin::new(9, Point3::origin())], 3),
            Err(MeshError::InvalidPin { pin: 1, vertex: 9 })
        ));
        assert!(matches!(
            validate_pins(&[ok, ok], 3),
            Err(MeshError::DuplicatePin { vertex: 0 })
        ));
        assert!(matches!(
            validate_pins(&[ok.with_radius(0.0)], 3),
            Err(MeshError::InvalidParameter { name: "radius", .. })
        ));
        assert!(matches!(
            validate_pins(&[Pin::new(1, Point3::new(f64::NAN, 0.0, 0.0))], 3),
            Err(MeshError::InvalidParameter { name: "target", .. })
        ));
        assert!(matches!(
            validate_pins(&[ok.with_metric(FalloffMetric::InversePower { power: -1.0 })], 3),
            Err(MeshError::InvalidParameter { name: "metric", .. })
        ));
    }
}
