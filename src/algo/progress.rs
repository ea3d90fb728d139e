//! Progress reporting for long-running deformations.
//!
//! A deformation runs in a fixed sequence of stages. Each stage owns an equal
//! slice of the overall progress range and reports its own sub-progress inside
//! that slice, so callers see a single monotone `current / total` stream.
//!
//! # Example
//!
//! ```
//! use elastic_mesh::algo::{Progress, Stage};
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//!
//! progress.report_stage(Stage::Solve, 3, 10);
//! ```

/// Stages of a deformation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Adjacency and cotangent weights.
    Prepare,
    /// Shortest paths from every pin.
    Geodesics,
    /// Rigid alignment plus inverse-distance displacement.
    InverseDistance,
    /// Local/global ARAP iterations.
    Solve,
    /// Falloff blending of the two fields.
    Blend,
}

impl Stage {
    /// Number of stages.
    pub const COUNT: usize = 5;

    /// Zero-based position of this stage.
    pub fn index(self) -> usize {
        match self {
            Stage::Prepare => 0,
            Stage::Geodesics => 1,
            Stage::InverseDistance => 2,
            Stage::Solve => 3,
            Stage::Blend => 4,
        }
    }

    /// Short human-readable description.
    pub fn message(self) -> &'static str {
        match self {
            Stage::Prepare => "Preparing mesh",
            Stage::Geodesics => "Computing geodesic distances",
            Stage::InverseDistance => "Inverse-distance seed",
            Stage::Solve => "ARAP iterations",
            Stage::Blend => "Blending falloff",
        }
    }
}

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Current step
/// - `total`: Total number of steps
/// - `message`: Description of the current operation
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report raw progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Report `sub_current / sub_total` of work done inside `stage`.
    ///
    /// Uses fixed-point arithmetic with 1000 steps per stage.
    pub fn report_stage(&self, stage: Stage, sub_current: usize, sub_total: usize) {
        let fraction = if sub_total == 0 {
            1000
        } else {
            (sub_current.min(sub_total) * 1000) / sub_total
        };
        let effective = stage.index() * 1000 + fraction;
        (self.callback)(effective, Stage::COUNT * 1000, stage.message());
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_stage_progress_is_monotone() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |current, total, _| {
            sink.lock().unwrap().push((current, total));
        });

        progress.report_stage(Stage::Prepare, 1, 1);
        progress.report_stage(Stage::Solve, 0, 4);
        progress.report_stage(Stage::Solve, 2, 4);
        progress.report_stage(Stage::Blend, 1, 1);

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(seen[2], (3500, 5000));
        assert_eq!(seen.last(), Some(&(5000, 5000)));
    }

    #[test]
    fn test_zero_total_counts_as_done() {
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |current, _, _| {
            *sink.lock().unwrap() = current;
        });
        progress.report_stage(Stage::Geodesics, 0, 0);
        assert_eq!(*seen.lock().unwrap(), 2000);
    }
}
