//! Shared fixtures for the planner tests: ready-made arms, frame resolvers
//! and scripted search algorithms.

use crate::kinematic_traits::{
    GroupKinematics, JointGroup, JointModel, JointType, JointVector, PlanningFrameOnly, Pose,
};
use crate::planar_arm::PlanarArm;
use crate::search::{SearchAlgorithm, SearchProblem, SolvedPath};
use crate::state_space::ConstrainedState;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

/// A zero-length single link: the tool spins in place at the origin, and the
/// joint angle tracks the screw progress one to one.
pub fn pivot_arm() -> PlanarArm {
    PlanarArm::new("arm", "tool", vec![0.0], vec![(-PI, PI)])
}

/// Three half-meter-ish links, full circle bounds on every joint.
pub fn three_r_arm() -> PlanarArm {
    PlanarArm::new(
        "arm",
        "tool",
        vec![0.5, 0.5, 0.3],
        vec![(-PI, PI), (-PI, PI), (-PI, PI)],
    )
}

pub fn world_frames() -> Arc<PlanningFrameOnly> {
    Arc::new(PlanningFrameOnly {
        planning_frame: "world".to_string(),
    })
}

/// A robot whose only joint carries no position bounds; state space
/// construction must refuse it before any sampling happens.
pub struct UnboundedRobot {
    group: JointGroup,
}

impl UnboundedRobot {
    pub fn new() -> Self {
        UnboundedRobot {
            group: JointGroup {
                name: "arm".to_string(),
                joints: vec![JointModel {
                    name: "spinner".to_string(),
                    joint_type: JointType::Revolute { bounds: None },
                }],
            },
        }
    }
}

impl GroupKinematics for UnboundedRobot {
    fn group(&self) -> &JointGroup {
        &self.group
    }

    fn frame_transform(&self, _joints: &[f64], _frame: &str) -> Option<Pose> {
        None
    }

    fn solve_ik(&self, _target: &Pose, _seed: &[f64], _ee_frame: &str) -> Option<JointVector> {
        None
    }

    fn collision_free(&self, _joints: &[f64]) -> bool {
        true
    }
}

/// A search algorithm that ignores the problem and replays a fixed path.
/// An empty script simulates a search that finds nothing.
pub struct ScriptedSearch {
    pub states: Vec<ConstrainedState>,
    pub resolution: f64,
}

impl ScriptedSearch {
    pub fn failing() -> Self {
        ScriptedSearch {
            states: Vec::new(),
            resolution: 0.05,
        }
    }
}

impl SearchAlgorithm for ScriptedSearch {
    fn solve(&self, _problem: &SearchProblem, _budget: Duration) -> Option<SolvedPath> {
        if self.states.is_empty() {
            None
        } else {
            Some(SolvedPath {
                states: self.states.clone(),
            })
        }
    }

    fn simplify(&self, _problem: &SearchProblem, _path: &mut SolvedPath, _budget: Duration) {}

    fn resolution(&self) -> f64 {
        self.resolution
    }
}
