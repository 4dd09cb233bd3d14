//! Conversion of a solved path into the response trajectory.
//!
//! Every emitted waypoint is revalidated. The first interpolated state that
//! fails the check truncates the trajectory right there: the already-emitted
//! prefix is kept as a genuine partial result with the completion fraction
//! telling how far along the screw it got. Downstream consumers rely on that
//! partial-progress report.

use crate::request::{PlanningResponse, TrajectoryPoint};
use crate::sampling::ValidityChecker;
use crate::search::SolvedPath;
use crate::state_space::{ConstrainedState, ConstrainedStateSpace};
use std::sync::Arc;
use tracing::debug;

/// Tolerance for accepting the final state's progress as "reached the
/// commanded angle".
pub const FINAL_THETA_TOLERANCE: f64 = 0.01;

pub struct TrajectoryExtractor<'a> {
    space: Arc<ConstrainedStateSpace>,
    checker: &'a dyn ValidityChecker,
    /// Waypoint spacing; normally the search algorithm's native resolution.
    resolution: f64,
}

impl<'a> TrajectoryExtractor<'a> {
    pub fn new(
        space: Arc<ConstrainedStateSpace>,
        checker: &'a dyn ValidityChecker,
        resolution: f64,
    ) -> Self {
        TrajectoryExtractor {
            space,
            checker,
            resolution,
        }
    }

    /// Interpolate the path so consecutive states are no further apart than
    /// the resolution. Original states are all kept.
    fn densify(&self, path: &SolvedPath) -> Vec<ConstrainedState> {
        let mut dense = Vec::new();
        for pair in path.states.windows(2) {
            dense.push(pair[0].clone());
            let distance = self.space.distance(&pair[0], &pair[1]);
            let steps = (distance / self.resolution).ceil() as usize;
            for i in 1..steps {
                let t = i as f64 / steps as f64;
                dense.push(self.space.interpolate(&pair[0], &pair[1], t));
            }
        }
        if let Some(last) = path.states.last() {
            dense.push(last.clone());
        }
        dense
    }

    /// Populate `response` from the solved path. A path of fewer than two
    /// states leaves the response in its failed/empty state.
    pub fn extract(
        &self,
        path: &SolvedPath,
        joint_names: Vec<String>,
        response: &mut PlanningResponse,
    ) {
        if path.states.len() < 2 {
            return;
        }

        let dense = self.densify(path);
        let theta_max = self.space.theta_max();

        response.joint_trajectory.joint_names = joint_names;
        response.joint_trajectory.points.reserve(dense.len());

        for state in &dense {
            if !self.checker.is_valid(state) {
                // An invalid state ends the trajectory; the valid prefix
                // stays usable and reports how far it made it.
                debug!(theta = state.theta, "trajectory truncated at invalid state");
                response.trajectory_is_valid = false;
                response.percentage_complete = state.theta / theta_max;
                return;
            }
            response.joint_trajectory.points.push(TrajectoryPoint {
                positions: state.joints.clone(),
            });
        }

        // The walk completed; accept only if the last state actually reached
        // the commanded angle.
        let final_theta = dense.last().map(|s| s.theta).unwrap_or(0.0);
        response.trajectory_is_valid = (theta_max - final_theta).abs() <= FINAL_THETA_TOLERANCE;
        response.percentage_complete = final_theta / theta_max;
        response.path_length = SolvedPath {
            states: dense,
        }
        .length(&self.space);
    }
}
