//! Best-fit rotations from cross-covariance matrices.
//!
//! Both the rigid pin alignment and the per-vertex ARAP local step reduce to
//! the same problem: given `S = Σ wᵢ · restᵢ · currentᵢᵀ`, find the proper
//! rotation `R` maximizing `tr(R·S)`. With `S = U·Σ·Vᵀ` the answer is
//! `R = V·Uᵀ`, unless that product is a reflection, in which case the singular
//! vector belonging to the smallest singular value is negated.
//!
//! Covariances of rank 0 or 1 do not determine a rotation. They are resolved
//! to the identity and to the minimal rotation between the two dominant
//! directions, respectively, so that collinear point sets (for example two
//! pins) never pick up an arbitrary twist about their common axis.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Rotation3, Unit, Vector3};

/// Singular values below this fraction of the largest one count as zero.
const RANK_TOLERANCE: f64 = 1e-9;

/// Closest proper rotation (`det = +1`) for the cross-covariance `covariance`.
///
/// # Example
///
/// ```
/// use elastic_mesh::algo::proper_rotation_from_covariance;
/// use nalgebra::{Matrix3, Rotation3, Vector3};
///
/// let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3);
/// let rest = [Vector3::x(), Vector3::y(), Vector3::z()];
///
/// let mut s = Matrix3::zeros();
/// for p in &rest {
///     s += p * (rotation * p).transpose();
/// }
///
/// let fitted = proper_rotation_from_covariance(&s);
/// assert!((fitted - rotation.matrix()).norm() < 1e-10);
/// ```
pub fn proper_rotation_from_covariance(covariance: &Matrix3<f64>) -> Matrix3<f64> {
    if !covariance.iter().all(|x| x.is_finite()) || covariance.amax() == 0.0 {
        return Matrix3::identity();
    }

    let svd = covariance.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Matrix3::identity();
    };
    let sigma = svd.singular_values;

    let i_max = sigma.imax();
    let i_min = sigma.imin();
    let rank = sigma
        .iter()
        .filter(|&&s| s > RANK_TOLERANCE * sigma[i_max])
        .count();

    if rank <= 1 {
        let from = u.column(i_max).into_owned();
        let to = v_t.row(i_max).transpose();
        return minimal_rotation(&from, &to);
    }

    let v = v_t.transpose();
    let rotation = v * u.transpose();
    if rotation.determinant() >= 0.0 {
        return rotation;
    }

    let mut u_fixed = u;
    u_fixed.column_mut(i_min).neg_mut();
    v * u_fixed.transpose()
}

/// Smallest rotation carrying direction `from` onto direction `to`.
fn minimal_rotation(from: &Vector3<f64>, to: &Vector3<f64>) -> Matrix3<f64> {
    if let Some(rotation) = Rotation3::rotation_between(from, to) {
        return rotation.into_inner();
    }

    // Opposite directions: half turn about any axis perpendicular to `from`.
    let mut axis = from.cross(&Vector3::x());
    if axis.norm_squared() < 1e-12 {
        axis = from.cross(&Vector3::y());
    }
    Rotation3::from_axis_angle(&Unit::new_normalize(axis), PI).into_inner()
}

/// Check that `m` is orthonormal with determinant +1, within `tolerance`.
pub fn is_proper_rotation(m: &Matrix3<f64>, tolerance: f64) -> bool {
    (m.transpose() * m - Matrix3::identity()).amax() <= tolerance
        && (m.determinant() - 1.0).abs() <= tolerance
}
