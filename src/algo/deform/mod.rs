//! Pin-driven deformation of a triangle mesh.
//!
//! The pipeline runs in four stages:
//!
//! 1. Edge-path geodesic distances from every pin.
//! 2. A closed-form inverse-distance field (rigid fit plus residual
//!    interpolation), exact at the pins.
//! 3. ARAP iterations seeded from that field.
//! 4. A falloff blend: inverse-distance near the pins, ARAP far away.
//!
//! # Example
//!
//! ```
//! use elastic_mesh::algo::deform::{deform, DeformOptions, Pin};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2], [0, 2, 3]];
//! let pins = vec![
//!     Pin::new(0, Point3::new(0.0, 0.0, 0.0)),
//!     Pin::new(2, Point3::new(1.0, 1.0, 0.5)),
//! ];
//!
//! let positions = deform(&vertices, &faces, &pins, &DeformOptions::default()).unwrap();
//! assert_eq!(positions.len(), 4);
//! assert_eq!(positions[2], Point3::new(1.0, 1.0, 0.5));
//! ```

mod pin;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use pin::{validate_pins, Pin};

use crate::error::{MeshError, Result};
use crate::mesh::MeshContext;

use super::arap::{uncoupled_vertices, ArapOptions, ArapSolver, FixedVertex};
use super::falloff::{blend, falloff_factors, BlendWeighting};
use super::geodesic::{geodesic_distances, DistanceMatrix};
use super::idw::{inverse_distance_field, IdwOptions};
use super::progress::{Progress, Stage};

/// What to do with vertices that no pin can reach along mesh edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    /// Leave them at their rest position.
    #[default]
    KeepRest,
    /// Use straight-line distances to the pins instead, so they follow the
    /// inverse-distance field.
    EuclideanFallback,
    /// Fail with [`MeshError::UnreachableVertex`].
    Error,
}

/// Options for [`deform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformOptions {
    /// ARAP solver settings.
    pub arap: ArapOptions,
    /// Inverse-distance field settings.
    pub idw: IdwOptions,
    /// How per-pin falloff values combine.
    pub weighting: BlendWeighting,
    /// Handling of vertices no pin reaches.
    pub unreachable: UnreachablePolicy,
    /// Allow the rayon thread pool in every stage. When off, the ARAP
    /// solver runs sequentially regardless of its own setting.
    pub parallel: bool,
}

impl Default for DeformOptions {
    fn default() -> Self {
        Self {
            arap: ArapOptions::default(),
            idw: IdwOptions::default(),
            weighting: BlendWeighting::default(),
            unreachable: UnreachablePolicy::default(),
            parallel: true,
        }
    }
}

impl DeformOptions {
    /// Set the ARAP iteration count.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.arap.iterations = iterations;
        self
    }

    /// Replace the ARAP options.
    pub fn with_arap(mut self, arap: ArapOptions) -> Self {
        self.arap = arap;
        self
    }

    /// Replace the inverse-distance options.
    pub fn with_idw(mut self, idw: IdwOptions) -> Self {
        self.idw = idw;
        self
    }

    /// Set the falloff weighting.
    pub fn with_weighting(mut self, weighting: BlendWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Set the unreachable-vertex policy.
    pub fn with_unreachable(mut self, policy: UnreachablePolicy) -> Self {
        self.unreachable = policy;
        self
    }

    /// Enable or disable multithreading in every stage.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Full result of a deformation.
#[derive(Debug, Clone)]
pub struct Deformation {
    /// New vertex positions, same length and order as the input.
    pub positions: Vec<Point3<f64>>,
    /// Pins × vertices distances used for weighting. Unreachable entries are
    /// infinite, or Euclidean under [`UnreachablePolicy::EuclideanFallback`].
    pub distances: DistanceMatrix,
    /// Per-vertex blend factor: 1 is fully inverse-distance, 0 fully ARAP.
    pub blend_factors: Vec<f64>,
    /// ARAP iterations actually performed.
    pub iterations_run: usize,
    /// Whether ARAP met its convergence tolerance.
    pub converged: bool,
    /// Triangle corners whose cotangent weight was dropped.
    pub degenerate_corners: usize,
    /// Vertices no pin reaches along mesh edges.
    pub unreachable: Vec<usize>,
    /// Reachable vertices held at their inverse-distance position because
    /// degenerate triangles cut them off from the ARAP system.
    pub decoupled: Vec<usize>,
}

/// Deform a mesh so that every pinned vertex lands on its target.
///
/// See [`deform_with_progress`] for details and errors.
pub fn deform(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
    pins: &[Pin],
    options: &DeformOptions,
) -> Result<Vec<Point3<f64>>> {
    deform_with_progress(vertices, faces, pins, options, &Progress::none()).map(|d| d.positions)
}

/// Deform a mesh and report per-stage progress.
///
/// # Errors
///
/// - [`MeshError::NoVertices`], [`MeshError::EmptyMesh`] or
///   [`MeshError::InvalidVertexIndex`] for a malformed mesh.
/// - [`MeshError::NoPins`], [`MeshError::InvalidPin`],
///   [`MeshError::DuplicatePin`] or [`MeshError::InvalidParameter`] for a bad
///   pin set or options.
/// - [`MeshError::UnreachableVertex`] under [`UnreachablePolicy::Error`].
/// - [`MeshError::DegenerateConstraint`] or [`MeshError::ConvergenceFailed`]
///   if the linear solve fails.
pub fn deform_with_progress(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
    pins: &[Pin],
    options: &DeformOptions,
    progress: &Progress,
) -> Result<Deformation> {
    let ctx = MeshContext::new(vertices, faces)?;
    validate_pins(pins, vertices.len())?;
    options.idw.validate()?;
    options.arap.validate()?;
    progress.report_stage(Stage::Prepare, 1, 1);

    let pin_vertices: Vec<usize> = pins.iter().map(|p| p.vertex).collect();
    let mut distances = geodesic_distances(&ctx, &pin_vertices, options.parallel);
    let unreachable = distances.unreachable_vertices();
    if !unreachable.is_empty() {
        warn!(count = unreachable.len(), policy = ?options.unreachable, "vertices unreachable from every pin");
        apply_unreachable_policy(&mut distances, &unreachable, vertices, &pin_vertices, options.unreachable)?;
    }
    progress.report_stage(Stage::Geodesics, 1, 1);

    let field = inverse_distance_field(&ctx, pins, &distances, &options.idw)?;
    progress.report_stage(Stage::InverseDistance, 1, 1);

    let mut fixed: Vec<FixedVertex> = pins
        .iter()
        .map(|p| FixedVertex {
            vertex: p.vertex,
            start: vertices[p.vertex],
            target: p.target,
        })
        .collect();
    let mut is_fixed = vec![false; vertices.len()];
    for &v in pin_vertices.iter().chain(&unreachable) {
        is_fixed[v] = true;
    }
    fixed.extend(
        unreachable
            .iter()
            .map(|&v| FixedVertex::frozen(v, field.positions[v])),
    );

    let decoupled = uncoupled_vertices(&ctx, &is_fixed);
    if !decoupled.is_empty() {
        warn!(
            count = decoupled.len(),
            "vertices cut off by degenerate triangles keep their inverse-distance position"
        );
        fixed.extend(decoupled.iter().map(|&v| FixedVertex::frozen(v, field.positions[v])));
    }

    let arap_options = ArapOptions {
        parallel: options.arap.parallel && options.parallel,
        ..options.arap
    };
    let solver = ArapSolver::new(&ctx, fixed, arap_options)?;
    let arap = solver.solve(field.positions.clone(), progress)?;

    let blend_factors = falloff_factors(&distances, pins, options.weighting, &options.idw);
    let mut positions = blend(&field.positions, &arap.positions, &blend_factors);
    for pin in pins {
        positions[pin.vertex] = pin.target;
    }
    progress.report_stage(Stage::Blend, 1, 1);

    if let Some(vertex) = positions
        .iter()
        .position(|p| !p.coords.iter().all(|c| c.is_finite()))
    {
        return Err(MeshError::DegenerateConstraint {
            vertex,
            reason: "solve produced a non-finite position",
        });
    }

    let max_displacement = positions
        .iter()
        .zip(vertices)
        .map(|(p, q)| (p - q).norm())
        .fold(0.0, f64::max);
    info!(
        vertices = vertices.len(),
        pins = pins.len(),
        iterations = arap.iterations_run,
        converged = arap.converged,
        max_displacement,
        "deformation complete"
    );

    Ok(Deformation {
        positions,
        distances,
        blend_factors,
        iterations_run: arap.iterations_run,
        converged: arap.converged,
        degenerate_corners: ctx.weights().degenerate_corners(),
        unreachable,
        decoupled,
    })
}

fn apply_unreachable_policy(
    distances: &mut DistanceMatrix,
    unreachable: &[usize],
    vertices: &[Point3<f64>],
    pin_vertices: &[usize],
    policy: UnreachablePolicy,
) -> Result<()> {
    match policy {
        UnreachablePolicy::KeepRest => {}
        UnreachablePolicy::Error => {
            return Err(MeshError::UnreachableVertex {
                vertex: unreachable[0],
            });
        }
        UnreachablePolicy::EuclideanFallback => {
            for &v in unreachable {
                for (p, &pin) in pin_vertices.iter().enumerate() {
                    distances.set(p, v, (vertices[v] - vertices[pin]).norm());
                }
            }
            debug!(count = unreachable.len(), "substituted Euclidean pin distances");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Vector3};
    use std::sync::{Arc, Mutex};

    fn assert_all_finite(positions: &[Point3<f64>]) {
        assert!(positions
            .iter()
            .all(|p| p.coords.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn test_pins_land_exactly() {
        let mesh = test_meshes::grid(5);
        let pins = vec![
            Pin::new(0, Point3::new(0.0, 0.0, 0.0)),
            Pin::new(5, Point3::new(5.0, 0.0, 1.0)),
            Pin::new(35, Point3::new(5.5, 5.5, 2.0)).with_radius(2.0),
        ];

        for weighting in [BlendWeighting::MaxFalloff, BlendWeighting::InverseDistanceScaled] {
            let options = DeformOptions::default().with_weighting(weighting);
            let positions = deform(&mesh.vertices, &mesh.faces, &pins, &options).unwrap();
            assert_eq!(positions.len(), mesh.num_vertices());
            for pin in &pins {
                assert_eq!(positions[pin.vertex], pin.target);
            }
            assert_all_finite(&positions);
        }
    }

    #[test]
    fn test_identity_when_pins_at_rest() {
        let mesh = test_meshes::grid(4);
        let pins: Vec<Pin> = [0, 12, 24]
            .iter()
            .map(|&v| Pin::new(v, mesh.vertices[v]))
            .collect();

        for parallel in [false, true] {
            let options = DeformOptions::default().with_parallel(parallel);
            let positions = deform(&mesh.vertices, &mesh.faces, &pins, &options).unwrap();
            for (p, q) in positions.iter().zip(&mesh.vertices) {
                assert_relative_eq!(*p, *q, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_single_triangle_translation() {
        let mesh = test_meshes::single_triangle();
        let shift = Vector3::new(0.3, -0.2, 1.0);
        let pins = vec![Pin::new(0, mesh.vertices[0] + shift)];

        for iterations in [1, 5] {
            let options = DeformOptions::default().with_iterations(iterations);
            let positions = deform(&mesh.vertices, &mesh.faces, &pins, &options).unwrap();
            for (p, q) in positions.iter().zip(&mesh.vertices) {
                assert_relative_eq!(*p, *q + shift, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_flat_quad_no_op_pins() {
        let mesh = test_meshes::flat_quad();
        let pins = vec![
            Pin::new(0, mesh.vertices[0]),
            Pin::new(2, mesh.vertices[2]),
        ];
        let positions = deform(&mesh.vertices, &mesh.faces, &pins, &DeformOptions::default()).unwrap();
        for (p, q) in positions.iter().zip(&mesh.vertices) {
            assert_relative_eq!(*p, *q, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_octahedron_rotated_pin_preserves_edges() {
        let mesh = test_meshes::octahedron();
        let quarter_turn = Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        let pins = vec![Pin::new(0, quarter_turn * mesh.vertices[0])];

        let before = test_meshes::edge_lengths(&mesh, &mesh.vertices);
        for iterations in [1, 10] {
            let options = DeformOptions::default().with_iterations(iterations);
            let positions = deform(&mesh.vertices, &mesh.faces, &pins, &options).unwrap();
            let after = test_meshes::edge_lengths(&mesh, &positions);
            for (a, b) in before.iter().zip(&after) {
                assert_relative_eq!(*a, *b, epsilon = 1e-6);
            }
            assert_relative_eq!(positions[0], Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_report_contents() {
        let mesh = test_meshes::grid(3);
        let pins = vec![Pin::new(5, Point3::new(1.0, 1.0, 1.0))];
        let options = DeformOptions::default().with_iterations(3);

        let report =
            deform_with_progress(&mesh.vertices, &mesh.faces, &pins, &options, &Progress::none())
                .unwrap();
        assert_eq!(report.iterations_run, 3);
        assert!(!report.converged);
        assert_eq!(report.distances.num_pins(), 1);
        assert_eq!(report.distances.get(0, 5), 0.0);
        assert_eq!(report.blend_factors[5], 1.0);
        assert!(report.blend_factors.iter().all(|f| (0.0..=1.0).contains(f)));
        assert!(report.unreachable.is_empty());
        assert!(report.decoupled.is_empty());
    }

    #[test]
    fn test_progress_covers_all_stages() {
        let mesh = test_meshes::grid(2);
        let pins = vec![Pin::new(0, Point3::new(0.0, 0.0, 0.5))];
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |current, total, _| {
            sink.lock().unwrap().push((current, total));
        });

        deform_with_progress(&mesh.vertices, &mesh.faces, &pins, &DeformOptions::default(), &progress)
            .unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(seen.last(), Some(&(Stage::COUNT * 1000, Stage::COUNT * 1000)));
    }

    #[test]
    fn test_unreachable_keep_rest() {
        let mesh = test_meshes::disjoint_triangles();
        let shift = Vector3::new(0.0, 0.0, 1.0);
        let pins = vec![Pin::new(0, mesh.vertices[0] + shift)];

        let report = deform_with_progress(
            &mesh.vertices,
            &mesh.faces,
            &pins,
            &DeformOptions::default(),
            &Progress::none(),
        )
        .unwrap();
        assert_eq!(report.unreachable, vec![3, 4, 5]);
        for v in 0..3 {
            assert_relative_eq!(report.positions[v], mesh.vertices[v] + shift, epsilon = 1e-8);
        }
        for v in 3..6 {
            assert_eq!(report.positions[v], mesh.vertices[v]);
        }
    }

    #[test]
    fn test_unreachable_euclidean_fallback() {
        let mesh = test_meshes::disjoint_triangles();
        let shift = Vector3::new(0.0, 0.0, 1.0);
        let pins = vec![Pin::new(0, mesh.vertices[0] + shift)];
        let options = DeformOptions::default().with_unreachable(UnreachablePolicy::EuclideanFallback);

        let report =
            deform_with_progress(&mesh.vertices, &mesh.faces, &pins, &options, &Progress::none())
                .unwrap();
        assert_relative_eq!(report.distances.get(0, 3), 5.0, epsilon = 1e-12);
        for v in 0..6 {
            assert_relative_eq!(report.positions[v], mesh.vertices[v] + shift, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_unreachable_error() {
        let mesh = test_meshes::disjoint_triangles();
        let pins = vec![Pin::new(4, mesh.vertices[4])];
        let options = DeformOptions::default().with_unreachable(UnreachablePolicy::Error);

        let err = deform(&mesh.vertices, &mesh.faces, &pins, &options).unwrap_err();
        assert!(matches!(err, MeshError::UnreachableVertex { vertex: 0 }));
    }

    #[test]
    fn test_degenerate_triangle_is_recovered() {
        let mesh = test_meshes::degenerate_sliver();
        let pins = vec![Pin::new(2, Point3::new(0.5, 1.0, 0.5))];

        let report = deform_with_progress(
            &mesh.vertices,
            &mesh.faces,
            &pins,
            &DeformOptions::default(),
            &Progress::none(),
        )
        .unwrap();
        assert_eq!(report.degenerate_corners, 3);
        assert_eq!(report.decoupled, vec![3]);
        assert_all_finite(&report.positions);
        assert_eq!(report.positions[2], pins[0].target);
    }

    #[test]
    fn test_invalid_input() {
        let mesh = test_meshes::single_triangle();
        let options = DeformOptions::default();

        assert!(matches!(
            deform(&mesh.vertices, &mesh.faces, &[], &options),
            Err(MeshError::NoPins)
        ));
        assert!(matches!(
            deform(&mesh.vertices, &mesh.faces, &[Pin::new(3, Point3::origin())], &options),
            Err(MeshError::InvalidPin { pin: 0, vertex: 3 })
        ));
        assert!(matches!(
            deform(&mesh.vertices, &[[0, 1, 5]], &[Pin::new(0, Point3::origin())], &options),
            Err(MeshError::InvalidVertexIndex { face: 0, vertex: 5 })
        ));
        assert!(matches!(
            deform(&[], &[], &[Pin::new(0, Point3::origin())], &options),
            Err(MeshError::NoVertices)
        ));

        let bad_idw = options.with_idw(IdwOptions::default().with_epsilon(-1.0));
        assert!(matches!(
            deform(&mesh.vertices, &mesh.faces, &[Pin::new(0, Point3::origin())], &bad_idw),
            Err(MeshError::InvalidParameter { name: "epsilon", .. })
        ));
    }

    #[test]
    fn test_options_from_json() {
        let options: DeformOptions = serde_json::from_str(
            r#"{ "arap": { "iterations": 4 }, "weighting": "inverse_distance_scaled", "unreachable": "euclidean_fallback" }"#,
        )
        .unwrap();
        assert_eq!(options.arap.iterations, 4);
        assert!(options.arap.ease_pins);
        assert_eq!(options.weighting, BlendWeighting::InverseDistanceScaled);
        assert_eq!(options.unreachable, UnreachablePolicy::EuclideanFallback);
        assert_eq!(options.idw, IdwOptions::default());
    }
}
