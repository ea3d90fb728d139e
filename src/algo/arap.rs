//! As-Rigid-As-Possible surface deformation.
//!
//! Each iteration alternates two steps:
//!
//! 1. **Local step**: fit, for every vertex, the rotation that best maps its
//!    rest-pose one-ring edges onto the current ones.
//! 2. **Global step**: solve the cotangent Laplace system for the free vertex
//!    positions given those rotations, with fixed vertices eliminated into the
//!    right-hand side.
//!
//! The reduced Laplacian only depends on the rest mesh and on which vertices
//! are fixed, so it is assembled and checked once in [`ArapSolver::new`].
//!
//! # References
//!
//! - Sorkine, O., & Alexa, M. (2007). "As-Rigid-As-Possible Surface
//!   Modeling." SGP 2007.

use std::collections::VecDeque;

use nalgebra::{DVector, Matrix3, Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{MeshError, Result};
use crate::mesh::MeshContext;

use super::progress::{Progress, Stage};
use super::rotation::proper_rotation_from_covariance;
use super::sparse::{conjugate_gradient, CsrMatrix};

/// Edges whose weight magnitude is below this do not couple their endpoints.
const MIN_COUPLING_WEIGHT: f64 = 1e-12;

/// Options for the ARAP solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArapOptions {
    /// Number of local/global iterations.
    pub iterations: usize,

    /// Move fixed vertices towards their targets in equal increments over the
    /// iterations instead of snapping them on the first one.
    pub ease_pins: bool,

    /// Stop early once the fixed vertices sit at their final targets and no
    /// vertex moved further than this during an iteration.
    pub convergence_tolerance: Option<f64>,

    /// Maximum iterations for the conjugate gradient solver (per coordinate).
    pub max_cg_iterations: usize,

    /// Relative residual tolerance for the CG solver.
    pub cg_tolerance: f64,

    /// Fit rotations and solve coordinates on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ArapOptions {
    fn default() -> Self {
        Self {
            iterations: 10,
            ease_pins: true,
            convergence_tolerance: None,
            max_cg_iterations: 2000,
            cg_tolerance: 1e-10,
            parallel: true,
        }
    }
}

impl ArapOptions {
    /// Set the number of iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Enable or disable easing of fixed vertices.
    pub fn with_ease_pins(mut self, ease: bool) -> Self {
        self.ease_pins = ease;
        self
    }

    /// Enable early exit once an iteration moves no vertex further than `tolerance`.
    pub fn with_convergence_tolerance(mut self, tolerance: f64) -> Self {
        self.convergence_tolerance = Some(tolerance);
        self
    }

    /// Set the maximum CG iterations per global step.
    pub fn with_max_cg_iterations(mut self, max_iter: usize) -> Self {
        self.max_cg_iterations = max_iter;
        self
    }

    /// Set the CG convergence tolerance.
    pub fn with_cg_tolerance(mut self, tol: f64) -> Self {
        self.cg_tolerance = tol;
        self
    }

    /// Enable or disable multithreading.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check that the parameters are usable.
    pub fn validate(&self) -> Result<()> {
        if let Some(tol) = self.convergence_tolerance {
            if !tol.is_finite() || tol < 0.0 {
                return Err(MeshError::invalid_param(
                    "convergence_tolerance",
                    tol,
                    "must be finite and non-negative",
                ));
            }
        }
        if self.max_cg_iterations == 0 {
            return Err(MeshError::invalid_param(
                "max_cg_iterations",
                0,
                "must be at least 1",
            ));
        }
        if !self.cg_tolerance.is_finite() || self.cg_tolerance <= 0.0 {
            return Err(MeshError::invalid_param(
                "cg_tolerance",
                self.cg_tolerance,
                "must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// A vertex whose position is prescribed rather than solved for.
///
/// During iteration `k` of `n` (with easing) the vertex sits at
/// `start + (k + 1) / n * (target - start)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedVertex {
    /// Vertex index.
    pub vertex: usize,
    /// Position the easing starts from, usually the rest position.
    pub start: Point3<f64>,
    /// Final position.
    pub target: Point3<f64>,
}

impl FixedVertex {
    /// A vertex held at `position` for the whole solve.
    pub fn frozen(vertex: usize, position: Point3<f64>) -> Self {
        Self {
            vertex,
            start: position,
            target: position,
        }
    }

    /// Position after easing by `alpha` in `[0, 1]`.
    #[inline]
    pub fn at(&self, alpha: f64) -> Point3<f64> {
        self.start + (self.target - self.start) * alpha
    }
}

/// Mutable state threaded through the iterations.
#[derive(Debug, Clone)]
pub struct SolverState {
    /// Current vertex positions.
    pub positions: Vec<Point3<f64>>,
    /// Rotation fitted to each vertex in the latest local step.
    pub rotations: Vec<Matrix3<f64>>,
}

/// Output of [`ArapSolver::solve`].
#[derive(Debug, Clone)]
pub struct ArapResult {
    /// Final vertex positions. Fixed vertices are exactly at their targets.
    pub positions: Vec<Point3<f64>>,
    /// Per-vertex rotations from the last local step.
    pub rotations: Vec<Matrix3<f64>>,
    /// Iterations actually performed.
    pub iterations_run: usize,
    /// Whether the last iteration moved every vertex by less than the
    /// convergence tolerance. Always `false` without a tolerance.
    pub converged: bool,
}

/// Local/global ARAP solver over a fixed mesh and constraint set.
///
/// # Example
///
/// ```
/// use elastic_mesh::algo::arap::{ArapOptions, ArapSolver, FixedVertex};
/// use elastic_mesh::algo::Progress;
/// use elastic_mesh::mesh::MeshContext;
/// use nalgebra::{Point3, Vector3};
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
/// let ctx = MeshContext::new(&vertices, &faces).unwrap();
///
/// let shift = Vector3::new(0.0, 0.0, 2.0);
/// let fixed = vec![FixedVertex { vertex: 0, start: vertices[0], target: vertices[0] + shift }];
/// let solver = ArapSolver::new(&ctx, fixed, ArapOptions::default()).unwrap();
///
/// // Seed with the translated mesh, as the inverse-distance field would.
/// let seed: Vec<_> = vertices.iter().map(|p| p + shift).collect();
/// let result = solver.solve(seed, &Progress::none()).unwrap();
/// assert!((result.positions[2] - (vertices[2] + shift)).norm() < 1e-6);
/// ```
#[derive(Debug)]
pub struct ArapSolver<'c, 'a> {
    ctx: &'c MeshContext<'a>,
    fixed: Vec<FixedVertex>,
    options: ArapOptions,
    /// Row of each free vertex in the reduced system, `None` for fixed ones.
    row_of: Vec<Option<usize>>,
    /// Vertex of each row.
    free: Vec<usize>,
    laplacian: CsrMatrix,
}

impl<'c, 'a> ArapSolver<'c, 'a> {
    /// Assemble the reduced Laplacian for the given fixed vertices.
    ///
    /// # Errors
    ///
    /// - [`MeshError::NoPins`] if `fixed` is empty.
    /// - [`MeshError::InvalidPin`] / [`MeshError::DuplicatePin`] for bad
    ///   fixed vertex indices.
    /// - [`MeshError::DegenerateConstraint`] if some free vertex has no path
    ///   of non-zero-weight edges to a fixed vertex, which would leave the
    ///   system singular.
    pub fn new(
        ctx: &'c MeshContext<'a>,
        fixed: Vec<FixedVertex>,
        options: ArapOptions,
    ) -> Result<Self> {
        options.validate()?;
        if fixed.is_empty() {
            return Err(MeshError::NoPins);
        }

        let n = ctx.num_vertices();
        let mut is_fixed = vec![false; n];
        for (i, f) in fixed.iter().enumerate() {
            if f.vertex >= n {
                return Err(MeshError::InvalidPin {
                    pin: i,
                    vertex: f.vertex,
                });
            }
            if is_fixed[f.vertex] {
                return Err(MeshError::DuplicatePin { vertex: f.vertex });
            }
            is_fixed[f.vertex] = true;
        }

        check_anchored(ctx, &is_fixed)?;

        let mut row_of = vec![None; n];
        let mut free = Vec::with_capacity(n - fixed.len());
        for v in 0..n {
            if !is_fixed[v] {
                row_of[v] = Some(free.len());
                free.push(v);
            }
        }

        let mut triplets = Vec::with_capacity(ctx.adjacency().num_directed_edges() + free.len());
        for (row, &i) in free.iter().enumerate() {
            let mut diagonal = 0.0;
            for (j, w) in ctx.weighted_neighbors(i) {
                diagonal += w;
                if let Some(col) = row_of[j] {
                    triplets.push((row, col, -w));
                }
            }
            triplets.push((row, row, diagonal));
        }
        let laplacian = CsrMatrix::from_triplets(free.len(), free.len(), triplets);

        debug!(
            free = free.len(),
            fixed = fixed.len(),
            nnz = laplacian.nnz(),
            "assembled reduced Laplacian"
        );

        Ok(Self {
            ctx,
            fixed,
            options,
            row_of,
            free,
            laplacian,
        })
    }

    /// Number of free (solved-for) vertices.
    pub fn num_free(&self) -> usize {
        self.free.len()
    }

    /// The fixed vertices.
    pub fn fixed(&self) -> &[FixedVertex] {
        &self.fixed
    }

    /// Run the local/global iterations starting from `seed`.
    ///
    /// Fixed vertices are moved to their targets in the seed before the first
    /// local step.
    ///
    /// # Errors
    ///
    /// - [`MeshError::InvalidParameter`] if `seed` has the wrong length.
    /// - [`MeshError::DegenerateConstraint`] if the system turns out not to be
    ///   positive definite (for example on meshes with strongly obtuse
    ///   triangles).
    /// - [`MeshError::ConvergenceFailed`] if a linear solve hits its
    ///   iteration cap.
    pub fn solve(&self, seed: Vec<Point3<f64>>, progress: &Progress) -> Result<ArapResult> {
        let n = self.ctx.num_vertices();
        if seed.len() != n {
            return Err(MeshError::invalid_param(
                "seed",
                seed.len(),
                "must match the vertex count",
            ));
        }

        let mut state = SolverState {
            positions: seed,
            rotations: vec![Matrix3::identity(); n],
        };
        for f in &self.fixed {
            state.positions[f.vertex] = f.target;
        }

        let iterations = self.options.iterations;
        let mut iterations_run = 0;
        let mut converged = false;

        for k in 0..iterations {
            let alpha = if self.options.ease_pins {
                (k + 1) as f64 / iterations as f64
            } else {
                1.0
            };

            state.rotations = self.local_step(&state.positions);
            let moved = self.global_step(&mut state, alpha)?;
            iterations_run = k + 1;

            trace!(iteration = k, alpha, max_displacement = moved, "ARAP iteration");
            progress.report_stage(Stage::Solve, k + 1, iterations);

            if let Some(tol) = self.options.convergence_tolerance {
                converged = moved < tol;
                if converged && alpha >= 1.0 {
                    debug!(iterations = iterations_run, "ARAP converged early");
                    break;
                }
            }
        }

        if iterations_run == 0 {
            state.rotations = self.local_step(&state.positions);
        }
        for f in &self.fixed {
            state.positions[f.vertex] = f.target;
        }

        Ok(ArapResult {
            positions: state.positions,
            rotations: state.rotations,
            iterations_run,
            converged,
        })
    }

    /// Best-fit rotation for every vertex, pinned ones included: their
    /// rotations enter the right-hand side of free neighbours.
    fn local_step(&self, positions: &[Point3<f64>]) -> Vec<Matrix3<f64>> {
        let fit = |i: usize| {
            let mut covariance = Matrix3::zeros();
            for (j, w) in self.ctx.weighted_neighbors(i) {
                let rest = self.ctx.rest_edge(i, j);
                let current = positions[i] - positions[j];
                covariance += w * rest * current.transpose();
            }
            proper_rotation_from_covariance(&covariance)
        };

        let n = self.ctx.num_vertices();
        if self.options.parallel {
            (0..n).into_par_iter().map(fit).collect()
        } else {
            (0..n).map(fit).collect()
        }
    }

    /// Solve for the free positions and ease the fixed ones by `alpha`.
    ///
    /// Returns the largest distance any vertex moved.
    fn global_step(&self, state: &mut SolverState, alpha: f64) -> Result<f64> {
        let mut anchored = state.positions.clone();
        for f in &self.fixed {
            anchored[f.vertex] = f.at(alpha);
        }

        let m = self.free.len();
        let mut rhs = [DVector::zeros(m), DVector::zeros(m), DVector::zeros(m)];
        for (row, &i) in self.free.iter().enumerate() {
            let mut b = Vector3::zeros();
            for (j, w) in self.ctx.weighted_neighbors(i) {
                let rotation = state.rotations[i] + state.rotations[j];
                b += 0.5 * w * (rotation * self.ctx.rest_edge(i, j));
                if self.row_of[j].is_none() {
                    b += w * anchored[j].coords;
                }
            }
            for (axis, column) in rhs.iter_mut().enumerate() {
                column[row] = b[axis];
            }
        }

        let solve_axis = |axis: usize| {
            let guess = DVector::from_iterator(m, self.free.iter().map(|&v| state.positions[v][axis]));
            conjugate_gradient(
                &self.laplacian,
                &rhs[axis],
                Some(&guess),
                self.options.max_cg_iterations,
                self.options.cg_tolerance,
            )
            .map_err(|err| self.map_solver_error(err))
        };
        let solutions: Vec<_> = if self.options.parallel {
            (0..3).into_par_iter().map(solve_axis).collect::<Result<_>>()?
        } else {
            (0..3).map(solve_axis).collect::<Result<_>>()?
        };

        for (row, &v) in self.free.iter().enumerate() {
            anchored[v] = Point3::new(solutions[0].x[row], solutions[1].x[row], solutions[2].x[row]);
        }

        let moved = state
            .positions
            .iter()
            .zip(&anchored)
            .map(|(a, b)| (b - a).norm())
            .fold(0.0, f64::max);

        state.positions = anchored;
        Ok(moved)
    }

    /// Translate row indices reported by the linear solver into vertices.
    fn map_solver_error(&self, err: MeshError) -> MeshError {
        match err {
            MeshError::DegenerateConstraint { vertex, reason } => MeshError::DegenerateConstraint {
                vertex: self.free.get(vertex).copied().unwrap_or(vertex),
                reason,
            },
            other => other,
        }
    }
}

/// Vertices with no path of non-zero-weight edges to any fixed vertex, in
/// ascending order.
///
/// Such vertices make the reduced Laplacian singular. They are either on a
/// component without pins or cut off by degenerate triangles.
pub fn uncoupled_vertices(ctx: &MeshContext<'_>, is_fixed: &[bool]) -> Vec<usize> {
    let n = ctx.num_vertices();
    let mut anchored = is_fixed.to_vec();
    let mut queue: VecDeque<usize> = (0..n).filter(|&v| is_fixed[v]).collect();

    while let Some(v) = queue.pop_front() {
        for (u, w) in ctx.weighted_neighbors(v) {
            if !anchored[u] && w.abs() > MIN_COUPLING_WEIGHT {
                anchored[u] = true;
                queue.push_back(u);
            }
        }
    }

    (0..n).filter(|&v| !anchored[v]).collect()
}

fn check_anchored(ctx: &MeshContext<'_>, is_fixed: &[bool]) -> Result<()> {
    match uncoupled_vertices(ctx, is_fixed).first() {
        Some(&vertex) => Err(MeshError::DegenerateConstraint {
            vertex,
            reason: "no path to a pinned vertex",
        }),
        None => Ok(()),
    }
}
