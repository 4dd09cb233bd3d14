//! Planning request and response payloads.
//!
//! These are plain in-process structures; putting them on a wire is the
//! caller's business.

use crate::kinematic_traits::{JointVector, Pose};
use nalgebra::{Point3, Vector3};

/// Screw specification as it arrives from the caller: an axis written in some
/// reference frame, plus the pitch. The commanded angle lives on the request.
#[derive(Debug, Clone)]
pub struct ScrewSpec {
    /// Frame the axis is expressed in.
    pub frame_id: String,
    /// A point the axis passes through.
    pub origin: Point3<f64>,
    /// Axis direction; normalized during planning.
    pub axis: Vector3<f64>,
    /// Linear displacement per radian of rotation. Zero for pure rotation.
    pub pitch: f64,
}

/// A request to move the end-effector along a screw path. Read-only input,
/// owned by the caller.
#[derive(Debug, Clone)]
pub struct PlanningRequest {
    pub screw: ScrewSpec,
    /// Commanded progress angle; the motion runs from 0 to this value.
    pub theta: f64,
    /// Name of the end-effector frame the screw constrains.
    pub ee_frame_name: String,
    /// Name of the joint group to plan for.
    pub group_name: String,
    /// Starting joint configuration. When given, its variable count must
    /// match the group exactly.
    pub start_joint_state: Option<JointVector>,
    /// Starting end-effector pose in the planning frame; consulted only when
    /// no starting joint configuration is given.
    pub start_pose: Option<Pose>,
}

/// One waypoint of the output trajectory. Positions only; timing and
/// velocities are left to a downstream time parameterization.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub positions: Vec<f64>,
}

/// An ordered joint trajectory.
#[derive(Debug, Clone, Default)]
pub struct JointTrajectory {
    pub joint_names: Vec<String>,
    pub points: Vec<TrajectoryPoint>,
}

/// Result payload of a planning attempt.
#[derive(Debug, Clone)]
pub struct PlanningResponse {
    pub joint_trajectory: JointTrajectory,
    /// True when every waypoint revalidated and the final waypoint reached
    /// the commanded angle. A false value with a non-empty trajectory is a
    /// usable partial result.
    pub trajectory_is_valid: bool,
    /// Fraction of the commanded angle actually covered, in [0, 1].
    pub percentage_complete: f64,
    /// Total path length in the search metric.
    pub path_length: f64,
}

impl PlanningResponse {
    /// The failed/empty state every planning attempt starts from.
    pub fn failed() -> Self {
        PlanningResponse {
            joint_trajectory: JointTrajectory::default(),
            trajectory_is_valid: false,
            percentage_complete: 0.0,
            path_length: 0.0,
        }
    }
}

impl Default for PlanningResponse {
    fn default() -> Self {
        Self::failed()
    }
}
