//! Types and traits connecting the planner to its robot model collaborators.
//!
//! The planner itself contains no kinematics solver and no collision detector.
//! Everything it needs from the robot is consumed through [`GroupKinematics`];
//! frame bookkeeping goes through [`FrameGraph`]. Implementations wrap whatever
//! robot stack is actually in use.

use nalgebra::Isometry3;

/// Pose of the end-effector. It contains both Cartesian position and rotation quaternion.
pub type Pose = Isometry3<f64>;

/// Joint variable vector of the planning group. The length equals the
/// variable count of the group (not the joint count: a planar joint
/// contributes three variables).
pub type JointVector = Vec<f64>;

/// Type of an active joint, carrying position bounds where the type has them.
#[derive(Debug, Clone, PartialEq)]
pub enum JointType {
    /// Rotational joint. Bounds are in radians; `None` means the joint
    /// is continuous / position-unbounded.
    Revolute { bounds: Option<(f64, f64)> },
    /// Sliding joint. Bounds are in meters.
    Prismatic { bounds: Option<(f64, f64)> },
    /// Planar joint: x and y translation plus one full-circle rotation.
    Planar,
}

/// One active joint of the planning group.
#[derive(Debug, Clone)]
pub struct JointModel {
    pub name: String,
    pub joint_type: JointType,
}

impl JointModel {
    /// Number of state variables this joint contributes.
    pub fn variable_count(&self) -> usize {
        match self.joint_type {
            JointType::Planar => 3,
            _ => 1,
        }
    }

    /// Names of the contributed variables, in order.
    pub fn variable_names(&self) -> Vec<String> {
        match self.joint_type {
            JointType::Planar => vec![
                format!("{}/x", self.name),
                format!("{}/y", self.name),
                format!("{}/theta", self.name),
            ],
            _ => vec![self.name.clone()],
        }
    }
}

/// The joint group (move group) a planner instance moves. Shared, read only,
/// set once when the robot model is loaded.
#[derive(Debug, Clone)]
pub struct JointGroup {
    pub name: String,
    pub joints: Vec<JointModel>,
}

impl JointGroup {
    pub fn variable_count(&self) -> usize {
        self.joints.iter().map(JointModel::variable_count).sum()
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.joints
            .iter()
            .flat_map(|j| j.variable_names())
            .collect()
    }
}

/// Robot model and kinematics collaborator.
///
/// Inverse kinematics is best effort and seed sensitive: for a reachable pose
/// it may still return `None` from an unlucky seed, and repeated calls with
/// different seeds may land on different solution branches. The planner treats
/// it as a retryable sampler, never as a deterministic function.
pub trait GroupKinematics {
    /// The joint group this model plans for.
    fn group(&self) -> &JointGroup;

    /// Forward kinematics: the pose of `frame` in the planning frame when the
    /// group variables are set to `joints`. `None` for unknown frames.
    fn frame_transform(&self, joints: &[f64], frame: &str) -> Option<Pose>;

    /// Solve inverse kinematics for `target` being the pose of `ee_frame`,
    /// starting from `seed`. Returns a full group joint vector on success.
    fn solve_ik(&self, target: &Pose, seed: &[f64], ee_frame: &str) -> Option<JointVector>;

    /// True when `joints` is free of collisions and self-collisions.
    fn collision_free(&self, joints: &[f64]) -> bool;
}

/// Coordinate transform collaborator: resolves named reference frames into the
/// planning frame so that screw specifications can be given in any frame.
pub trait FrameGraph {
    /// Transform from `frame` into the planning frame, or `None` when the
    /// frame is unknown.
    fn to_planning_frame(&self, frame: &str) -> Option<Pose>;
}

/// Resolver for setups where requests are already expressed in the planning
/// frame: it knows that single frame and nothing else.
pub struct PlanningFrameOnly {
    pub planning_frame: String,
}

impl FrameGraph for PlanningFrameOnly {
    fn to_planning_frame(&self, frame: &str) -> Option<Pose> {
        if frame == self.planning_frame {
            Some(Pose::identity())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revolute(name: &str) -> JointModel {
        JointModel {
            name: name.to_string(),
            joint_type: JointType::Revolute {
                bounds: Some((-1.0, 1.0)),
            },
        }
    }

    #[test]
    fn test_variable_counting() {
        let group = JointGroup {
            name: "arm".to_string(),
            joints: vec![
                revolute("j1"),
                JointModel {
                    name: "base".to_string(),
                    joint_type: JointType::Planar,
                },
                revolute("j2"),
            ],
        };
        assert_eq!(group.variable_count(), 5);
        assert_eq!(
            group.variable_names(),
            vec!["j1", "base/x", "base/y", "base/theta", "j2"]
        );
    }

    #[test]
    fn test_planning_frame_only() {
        let frames = PlanningFrameOnly {
            planning_frame: "world".to_string(),
        };
        assert!(frames.to_planning_frame("world").is_some());
        assert!(frames.to_planning_frame("door_handle").is_none());
    }
}
