//! Sampling and validity checking on the constrained space.
//!
//! Plain uniform sampling of the compound space would almost never hit the
//! pose constraint manifold, so the samplers here work the other way around:
//! draw a progress value, ask the constraint model which end-effector pose
//! that value demands, and let inverse kinematics produce a joint vector for
//! it. The validity checker is the single authority on whether a state is
//! acceptable; everything it rejects is rejected silently.

use crate::kinematic_traits::GroupKinematics;
use crate::planning_error::PlanningError;
use crate::screw_axis::ScrewConstraintModel;
use crate::state_space::{ConstrainedState, ConstrainedStateSpace};
use crate::utils::pose_distance;
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Default positional tolerance of the pose constraint, meters.
pub const DEFAULT_POSITION_TOLERANCE: f64 = 0.005;
/// Default angular tolerance of the pose constraint, radians (half a degree).
pub const DEFAULT_ANGULAR_TOLERANCE: f64 = 0.5 * std::f64::consts::PI / 180.0;
/// How many draws the valid-state sampler makes before giving up.
pub const DEFAULT_VALID_SAMPLE_ATTEMPTS: usize = 50;

/// Draws states of the constrained space. Implementations never return a
/// state that violates the space bounds.
pub trait StateSampler {
    fn sample(&mut self) -> ConstrainedState;
}

/// Accepts or rejects candidate states. Rejection is silent: a `false` is an
/// ordinary answer, not an error.
pub trait ValidityChecker {
    fn is_valid(&self, state: &ConstrainedState) -> bool;
}

fn metadata_constraint(
    space: &ConstrainedStateSpace,
) -> Result<(ScrewConstraintModel, String), PlanningError> {
    let metadata = space.metadata().ok_or_else(|| {
        PlanningError::Initialization(
            "state space carries no screw metadata; set_metadata must run before sampling"
                .to_string(),
        )
    })?;
    Ok((
        metadata.constraint.clone(),
        metadata.ee_frame_name.clone(),
    ))
}

/// Base sampler: uniform progress draw, then one inverse kinematics attempt
/// at the constrained pose from a random in-bounds seed. When IK fails the
/// random seed itself is returned; it is within bounds, and the validity
/// checker will sort it out.
pub struct ScrewSampler {
    space: Arc<ConstrainedStateSpace>,
    kinematics: Arc<dyn GroupKinematics>,
    constraint: ScrewConstraintModel,
    ee_frame: String,
    seed_scratch: Vec<f64>,
}

impl ScrewSampler {
    pub fn new(
        space: Arc<ConstrainedStateSpace>,
        kinematics: Arc<dyn GroupKinematics>,
    ) -> Result<Self, PlanningError> {
        let (constraint, ee_frame) = metadata_constraint(&space)?;
        Ok(ScrewSampler {
            space,
            kinematics,
            constraint,
            ee_frame,
            seed_scratch: Vec::new(),
        })
    }
}

impl StateSampler for ScrewSampler {
    fn sample(&mut self) -> ConstrainedState {
        let mut rng = rand::thread_rng();
        let theta = rng.gen_range(0.0..=self.space.theta_max());
        let target = self.constraint.pose_at(theta);
        self.space
            .bounds()
            .sample_uniform(&mut rng, &mut self.seed_scratch);
        let mut joints = self
            .kinematics
            .solve_ik(&target, &self.seed_scratch, &self.ee_frame)
            .unwrap_or_else(|| self.seed_scratch.clone());
        self.space.bounds().clamp(&mut joints);
        ConstrainedState::new(theta, joints)
    }
}

/// Valid-state sampler: repeats the base draw until the checker accepts one
/// or the attempt budget runs out. On exhaustion the last draw is returned;
/// downstream validity checks will reject it again, which only costs the
/// search one wasted extension.
pub struct ScrewValidSampler {
    inner: ScrewSampler,
    checker: Box<dyn ValidityChecker>,
    pub max_attempts: usize,
}

impl ScrewValidSampler {
    pub fn new(inner: ScrewSampler, checker: Box<dyn ValidityChecker>) -> Self {
        ScrewValidSampler {
            inner,
            checker,
            max_attempts: DEFAULT_VALID_SAMPLE_ATTEMPTS,
        }
    }
}

impl StateSampler for ScrewValidSampler {
    fn sample(&mut self) -> ConstrainedState {
        let mut state = self.inner.sample();
        for attempt in 1..self.max_attempts {
            if self.checker.is_valid(&state) {
                return state;
            }
            debug!(attempt, theta = state.theta, "sample rejected, redrawing");
            state = self.inner.sample();
        }
        state
    }
}

/// The constraint arbiter: a state passes iff the joint vector is within
/// bounds, forward kinematics of the end-effector frame lands on the pose the
/// constraint model demands at the state's progress value, and the
/// configuration is collision free.
pub struct ScrewValidityChecker {
    space: Arc<ConstrainedStateSpace>,
    kinematics: Arc<dyn GroupKinematics>,
    constraint: ScrewConstraintModel,
    ee_frame: String,
    pub position_tolerance: f64,
    pub angular_tolerance: f64,
}

impl ScrewValidityChecker {
    pub fn new(
        space: Arc<ConstrainedStateSpace>,
        kinematics: Arc<dyn GroupKinematics>,
    ) -> Result<Self, PlanningError> {
        let (constraint, ee_frame) = metadata_constraint(&space)?;
        Ok(ScrewValidityChecker {
            space,
            kinematics,
            constraint,
            ee_frame,
            position_tolerance: DEFAULT_POSITION_TOLERANCE,
            angular_tolerance: DEFAULT_ANGULAR_TOLERANCE,
        })
    }

    pub fn with_tolerances(mut self, position: f64, angular: f64) -> Self {
        self.position_tolerance = position;
        self.angular_tolerance = angular;
        self
    }
}

impl ValidityChecker for ScrewValidityChecker {
    fn is_valid(&self, state: &ConstrainedState) -> bool {
        if !self.space.satisfies_bounds(state) {
            return false;
        }
        let Some(actual) = self
            .kinematics
            .frame_transform(&state.joints, &self.ee_frame)
        else {
            return false;
        };
        let target = self.constraint.pose_at(state.theta);
        let (position_gap, angular_gap) = pose_distance(&actual, &target);
        if position_gap > self.position_tolerance || angular_gap > self.angular_tolerance {
            return false;
        }
        self.kinematics.collision_free(&state.joints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematic_traits::Pose;
    use crate::planar_arm::{Obstacle, PlanarArm};
    use crate::screw_axis::ScrewAxis;
    use crate::state_space::{JointSpaceBounds, SpaceMetadata};
    use nalgebra::{Point3, Vector3};
    use std::f64::consts::PI;

    // A single revolute joint spinning the tool frame in place: the joint
    // angle and the screw progress coincide exactly.
    fn pivot_setup() -> (Arc<ConstrainedStateSpace>, Arc<dyn GroupKinematics>) {
        let arm = PlanarArm::new("arm", "tool", vec![0.0], vec![(-PI, PI)]);
        let start = arm.frame_transform(&[0.0], "tool").unwrap();
        let axis = ScrewAxis::new(Vector3::z(), Point3::origin(), 0.0).unwrap();
        let bounds = JointSpaceBounds::from_group(arm.group()).unwrap();
        let mut space = ConstrainedStateSpace::new(PI / 2.0, bounds).unwrap();
        space
            .set_metadata(SpaceMetadata {
                constraint: ScrewConstraintModel::new(axis, start, PI / 2.0),
                ee_frame_name: "tool".to_string(),
                group_name: "arm".to_string(),
            })
            .unwrap();
        space.lock();
        (Arc::new(space), Arc::new(arm))
    }

    #[test]
    fn test_sampler_respects_bounds() {
        let (space, kinematics) = pivot_setup();
        let mut sampler = ScrewSampler::new(space.clone(), kinematics).unwrap();
        for _ in 0..50 {
            let state = sampler.sample();
            assert!(space.satisfies_bounds(&state), "out of bounds: {:?}", state);
        }
    }

    #[test]
    fn test_checker_accepts_manifold_states() {
        let (space, kinematics) = pivot_setup();
        let checker = ScrewValidityChecker::new(space, kinematics).unwrap();
        for theta in [0.0, 0.3, PI / 2.0] {
            assert!(checker.is_valid(&ConstrainedState::new(theta, vec![theta])));
        }
    }

    #[test]
    fn test_checker_rejects_constraint_violation() {
        let (space, kinematics) = pivot_setup();
        let checker = ScrewValidityChecker::new(space, kinematics).unwrap();
        // Joint angle far from the progress value: pose mismatch.
        assert!(!checker.is_valid(&ConstrainedState::new(0.0, vec![1.0])));
        // Progress out of range.
        assert!(!checker.is_valid(&ConstrainedState::new(2.0 * PI, vec![0.0])));
    }

    #[test]
    fn test_checker_rejects_collision() {
        let arm = PlanarArm::new("arm", "tool", vec![1.0], vec![(-PI, PI)])
            .with_obstacles(vec![Obstacle {
                // Sits right on the link when the joint is near zero.
                center: Point3::new(0.5, 0.0, 0.0),
                radius: 0.05,
            }]);
        let start = arm.frame_transform(&[0.0], "tool").unwrap();
        let axis = ScrewAxis::new(Vector3::z(), Point3::origin(), 0.0).unwrap();
        let bounds = JointSpaceBounds::from_group(arm.group()).unwrap();
        let mut space = ConstrainedStateSpace::new(PI / 2.0, bounds).unwrap();
        space
            .set_metadata(SpaceMetadata {
                constraint: ScrewConstraintModel::new(axis, start, PI / 2.0),
                ee_frame_name: "tool".to_string(),
                group_name: "arm".to_string(),
            })
            .unwrap();
        space.lock();
        let space = Arc::new(space);
        let checker = ScrewValidityChecker::new(space, Arc::new(arm)).unwrap();
        // Pose constraint satisfied, but the link passes through the obstacle.
        assert!(!checker.is_valid(&ConstrainedState::new(0.0, vec![0.0])));
        // Far enough around the circle the link clears it.
        assert!(checker.is_valid(&ConstrainedState::new(PI / 2.0, vec![PI / 2.0])));
    }

    #[test]
    fn test_valid_sampler_returns_valid_states() {
        let (space, kinematics) = pivot_setup();
        let checker = ScrewValidityChecker::new(space.clone(), kinematics.clone()).unwrap();
        let verify = ScrewValidityChecker::new(space.clone(), kinematics.clone()).unwrap();
        let inner = ScrewSampler::new(space, kinematics).unwrap();
        let mut sampler = ScrewValidSampler::new(inner, Box::new(checker));
        for _ in 0..20 {
            let state = sampler.sample();
            assert!(verify.is_valid(&state));
        }
    }

    #[test]
    fn test_sampler_requires_metadata() {
        let arm = PlanarArm::new("arm", "tool", vec![0.0], vec![(-PI, PI)]);
        let bounds = JointSpaceBounds::from_group(arm.group()).unwrap();
        let space = Arc::new(ConstrainedStateSpace::new(1.0, bounds).unwrap());
        assert!(ScrewSampler::new(space.clone(), Arc::new(arm)).is_err());
    }
}
