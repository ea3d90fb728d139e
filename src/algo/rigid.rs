//! Rigid alignment of pin rest positions onto pin targets.
//!
//! Orthogonal Procrustes: center both point sets, fit a rotation to their
//! cross-covariance and derive the translation from the centroids.

use nalgebra::{Matrix3, Point3, Vector3};

use crate::error::{MeshError, Result};

use super::rotation::proper_rotation_from_covariance;

/// A rotation followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    /// Proper rotation matrix.
    pub rotation: Matrix3<f64>,
    /// Translation applied after the rotation.
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    /// The transform that leaves every point where it is.
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Apply the transform to a point.
    #[inline]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * p.coords + self.translation)
    }

    /// Apply only the rotation to a vector.
    #[inline]
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * v
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Best-fit rigid transform mapping `rest` points onto `target` points.
///
/// A single correspondence yields a pure translation. Collinear
/// correspondences yield the minimal rotation about the shared axis.
///
/// # Errors
///
/// Returns [`MeshError::InvalidParameter`] if the slices are empty or have
/// different lengths.
///
/// # Example
///
/// ```
/// use elastic_mesh::algo::rigid_align;
/// use nalgebra::{Point3, Vector3};
///
/// let rest = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let offset = Vector3::new(1.0, 2.0, 3.0);
/// let target: Vec<_> = rest.iter().map(|p| p + offset).collect();
///
/// let transform = rigid_align(&rest, &target).unwrap();
/// assert!((transform.translation - offset).norm() < 1e-10);
/// ```
pub fn rigid_align(rest: &[Point3<f64>], target: &[Point3<f64>]) -> Result<RigidTransform> {
    if rest.is_empty() {
        return Err(MeshError::invalid_param("rest", 0, "need at least one point"));
    }
    if rest.len() != target.len() {
        return Err(MeshError::invalid_param(
            "target",
            target.len(),
            "must match the number of rest points",
        ));
    }

    let rest_centroid = centroid(rest);
    let target_centroid = centroid(target);

    let mut covariance = Matrix3::zeros();
    for (p, q) in rest.iter().zip(target) {
        covariance += (p.coords - rest_centroid) * (q.coords - target_centroid).transpose();
    }

    let rotation = proper_rotation_from_covariance(&covariance);
    let translation = target_centroid - rotation * rest_centroid;

    Ok(RigidTransform {
        rotation,
        translation,
    })
}

fn centroid(points: &[Point3<f64>]) -> Vector3<f64> {
    points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / points.len() as f64
}
