//! Sparse matrix storage and a conjugate gradient solver.
//!
//! The ARAP global step assembles one cotangent Laplacian restricted to the
//! free vertices and solves it three times per iteration (once per
//! coordinate). The matrix is symmetric positive definite whenever every free
//! vertex is connected to a fixed one, which is exactly what CG needs.

use nalgebra::DVector;

use crate::error::{MeshError, Result};

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    /// `row_ptr[i]..row_ptr[i + 1]` indexes the entries of row `i`.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from `(row, col, value)` triplets.
    ///
    /// Duplicate entries at the same position are summed.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            debug_assert!(row < rows && col < cols, "triplet out of bounds");
            if last == Some((row, col)) {
                if let Some(v) = values.last_mut() {
                    *v += val;
                }
                continue;
            }
            col_idx.push(col);
            values.push(val);
            row_ptr[row + 1] += 1;
            last = Some((row, col));
        }

        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Entry at `(row, col)`, zero if it is not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[range.clone()].binary_search(&col) {
            Ok(k) => self.values[range.start + k],
            Err(_) => 0.0,
        }
    }

    /// Multiply matrix by vector: `y = A * x`.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        let mut y = DVector::zeros(self.rows);
        for i in 0..self.rows {
            let mut sum = 0.0;
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum += self.values[k] * x[self.col_idx[k]];
            }
            y[i] = sum;
        }
        y
    }
}

/// Outcome of a successful conjugate gradient solve.
#[derive(Debug, Clone)]
pub struct CgSolution {
    /// The solution vector.
    pub x: DVector<f64>,
    /// Iterations performed; zero when the initial guess already satisfied
    /// the tolerance.
    pub iterations: usize,
}

/// Solve `A * x = b` with the conjugate gradient method.
///
/// `A` must be symmetric positive definite. The iteration starts from `x0`
/// when given, so a good warm start costs nothing: if `x0` already satisfies
/// the tolerance it is returned unchanged.
///
/// The tolerance is relative to `‖b‖`, or absolute when `b` is zero.
///
/// # Errors
///
/// - [`MeshError::DegenerateConstraint`] if a search direction has
///   non-positive curvature, meaning `A` is singular or indefinite. The
///   reported vertex is the row where that direction is largest.
/// - [`MeshError::ConvergenceFailed`] if the residual is still above the
///   tolerance after `max_iter` iterations.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> Result<CgSolution> {
    let n = b.len();
    assert_eq!(a.nrows(), n, "Matrix-vector dimension mismatch");
    assert_eq!(a.ncols(), n, "Matrix must be square");

    let mut x = match x0 {
        Some(x0) => x0.clone(),
        None => DVector::zeros(n),
    };
    if n == 0 {
        return Ok(CgSolution { x, iterations: 0 });
    }

    let b_norm = b.norm();
    let threshold = tolerance * if b_norm > 0.0 { b_norm } else { 1.0 };

    let mut r = b - a.mul_vec(&x);
    let mut r_norm_sq = r.dot(&r);
    if r_norm_sq.sqrt() <= threshold {
        return Ok(CgSolution { x, iterations: 0 });
    }

    let mut p = r.clone();
    let scale = a.values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));

    for iter in 0..max_iter {
        let ap = a.mul_vec(&p);

        let p_ap = p.dot(&ap);
        if p_ap.is_nan() || p_ap <= f64::EPSILON * scale * p.norm_squared() {
            return Err(MeshError::DegenerateConstraint {
                vertex: p.iamax(),
                reason: "system matrix is not positive definite",
            });
        }
        let alpha = r_norm_sq / p_ap;

        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        let new_r_norm_sq = r.dot(&r);
        if new_r_norm_sq.sqrt() <= threshold {
            return Ok(CgSolution {
                x,
                iterations: iter + 1,
            });
        }

        let beta = new_r_norm_sq / r_norm_sq;
        p = &r + beta * &p;
        r_norm_sq = new_r_norm_sq;
    }

    Err(MeshError::ConvergenceFailed {
        iterations: max_iter,
    })
}
