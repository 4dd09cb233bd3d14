//! The compound space the search runs in: a bounded scalar progress
//! dimension paired with the bounded joint subspace of the planning group.

use crate::kinematic_traits::{JointGroup, JointType};
use crate::planning_error::PlanningError;
use crate::screw_axis::ScrewConstraintModel;
use rand::Rng;
use std::f64::consts::PI;

/// Position range a planar joint's translational variables get. Planar joints
/// carry no position bounds of their own, so the range is just "large".
const PLANAR_TRANSLATION_LIMIT: f64 = 1e3;

/// A point of the compound space: progress along the screw plus the joint
/// variables. The pose constraint tying the two together is enforced by the
/// validity checker, not by this representation; rejected samples may
/// transiently violate it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrainedState {
    pub theta: f64,
    pub joints: Vec<f64>,
}

impl ConstrainedState {
    pub fn new(theta: f64, joints: Vec<f64>) -> Self {
        ConstrainedState { theta, joints }
    }

    /// Flatten into `[theta, q0, q1, ...]` for metric search structures.
    pub fn flatten(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(1 + self.joints.len());
        flat.push(self.theta);
        flat.extend_from_slice(&self.joints);
        flat
    }

    /// Inverse of [`ConstrainedState::flatten`].
    pub fn from_flat(flat: &[f64]) -> Self {
        ConstrainedState {
            theta: flat[0],
            joints: flat[1..].to_vec(),
        }
    }
}

/// Per-variable position bounds of the joint subspace.
#[derive(Debug, Clone, Default)]
pub struct JointSpaceBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl JointSpaceBounds {
    /// Derive bounds from the group's active joints. Revolute and prismatic
    /// joints contribute their position range; planar joints contribute two
    /// large translational dimensions and one full-circle rotation. Any other
    /// situation (here: a revolute or prismatic joint without position
    /// bounds) is a configuration error.
    pub fn from_group(group: &JointGroup) -> Result<Self, PlanningError> {
        let mut lower = Vec::with_capacity(group.variable_count());
        let mut upper = Vec::with_capacity(group.variable_count());
        for joint in &group.joints {
            match &joint.joint_type {
                JointType::Revolute { bounds: Some((lo, hi)) }
                | JointType::Prismatic { bounds: Some((lo, hi)) } => {
                    if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                        return Err(PlanningError::Initialization(format!(
                            "joint '{}' has unusable position bounds [{}, {}]",
                            joint.name, lo, hi
                        )));
                    }
                    lower.push(*lo);
                    upper.push(*hi);
                }
                JointType::Revolute { bounds: None } | JointType::Prismatic { bounds: None } => {
                    return Err(PlanningError::Initialization(format!(
                        "joint '{}' has no position bounds",
                        joint.name
                    )));
                }
                JointType::Planar => {
                    lower.extend_from_slice(&[
                        -PLANAR_TRANSLATION_LIMIT,
                        -PLANAR_TRANSLATION_LIMIT,
                        -PI,
                    ]);
                    upper.extend_from_slice(&[
                        PLANAR_TRANSLATION_LIMIT,
                        PLANAR_TRANSLATION_LIMIT,
                        PI,
                    ]);
                }
            }
        }
        Ok(JointSpaceBounds { lower, upper })
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn contains(&self, joints: &[f64]) -> bool {
        joints.len() == self.len()
            && joints
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(q, (lo, hi))| *q >= *lo && *q <= *hi)
    }

    /// Clamp a joint vector into the bounds in place.
    pub fn clamp(&self, joints: &mut [f64]) {
        for (q, (lo, hi)) in joints.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            *q = q.clamp(*lo, *hi);
        }
    }

    /// Fill `out` with a uniform random joint vector. Used for randomized
    /// IK seeding.
    pub fn sample_uniform<R: Rng>(&self, rng: &mut R, out: &mut Vec<f64>) {
        out.clear();
        for (lo, hi) in self.lower.iter().zip(&self.upper) {
            out.push(if hi > lo { rng.gen_range(*lo..=*hi) } else { *lo });
        }
    }
}

/// Metadata the samplers and validity checkers read off the space instead of
/// having it re-threaded through every call: the constraint model (screw axis,
/// start pose, commanded angle), the end-effector frame and the group name.
#[derive(Debug, Clone)]
pub struct SpaceMetadata {
    pub constraint: ScrewConstraintModel,
    pub ee_frame_name: String,
    pub group_name: String,
}

/// The compound space `{progress in [0, theta_max]} x {joints in bounds}`.
///
/// After [`ConstrainedStateSpace::lock`] the structure is frozen: samplers and
/// validity checkers built against a locked space observe a stable
/// dimensionality and stable metadata for the whole plan.
#[derive(Debug)]
pub struct ConstrainedStateSpace {
    theta_max: f64,
    bounds: JointSpaceBounds,
    metadata: Option<SpaceMetadata>,
    locked: bool,
}

impl ConstrainedStateSpace {
    /// A zero or negative commanded angle leaves the progress dimension
    /// degenerate and is rejected here, before any sampling can start.
    pub fn new(theta_max: f64, bounds: JointSpaceBounds) -> Result<Self, PlanningError> {
        if !theta_max.is_finite() || theta_max <= 0.0 {
            return Err(PlanningError::Initialization(format!(
                "commanded screw angle must be positive and finite, got {}",
                theta_max
            )));
        }
        if bounds.is_empty() {
            return Err(PlanningError::Initialization(
                "joint group contributes no variables".to_string(),
            ));
        }
        Ok(ConstrainedStateSpace {
            theta_max,
            bounds,
            metadata: None,
            locked: false,
        })
    }

    pub fn theta_max(&self) -> f64 {
        self.theta_max
    }

    pub fn bounds(&self) -> &JointSpaceBounds {
        &self.bounds
    }

    /// Progress dimension plus joint variables.
    pub fn dimension(&self) -> usize {
        1 + self.bounds.len()
    }

    pub fn metadata(&self) -> Option<&SpaceMetadata> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: SpaceMetadata) -> Result<(), PlanningError> {
        if self.locked {
            return Err(PlanningError::Initialization(
                "state space is locked, metadata can no longer change".to_string(),
            ));
        }
        self.metadata = Some(metadata);
        Ok(())
    }

    /// Freeze the space before handing it to samplers and checkers.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Bounds check on both the progress value and the joint vector.
    pub fn satisfies_bounds(&self, state: &ConstrainedState) -> bool {
        state.theta >= 0.0
            && state.theta <= self.theta_max
            && self.bounds.contains(&state.joints)
    }

    /// Euclidean metric on the flattened `[theta, q...]` vector.
    pub fn distance(&self, a: &ConstrainedState, b: &ConstrainedState) -> f64 {
        let dt = a.theta - b.theta;
        (dt * dt
            + a.joints
                .iter()
                .zip(&b.joints)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>())
        .sqrt()
    }

    /// Linear interpolation from `a` to `b` at fraction `t` in [0, 1].
    pub fn interpolate(&self, a: &ConstrainedState, b: &ConstrainedState, t: f64) -> ConstrainedState {
        ConstrainedState {
            theta: a.theta + (b.theta - a.theta) * t,
            joints: a
                .joints
                .iter()
                .zip(&b.joints)
                .map(|(x, y)| x + (y - x) * t)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematic_traits::{JointModel, Pose};
    use crate::screw_axis::ScrewAxis;
    use nalgebra::{Point3, Vector3};

    fn group(joints: Vec<JointModel>) -> JointGroup {
        JointGroup {
            name: "arm".to_string(),
            joints,
        }
    }

    fn bounded_revolute(name: &str, lo: f64, hi: f64) -> JointModel {
        JointModel {
            name: name.to_string(),
            joint_type: JointType::Revolute {
                bounds: Some((lo, hi)),
            },
        }
    }

    #[test]
    fn test_bounds_from_mixed_group() {
        let g = group(vec![
            bounded_revolute("j1", -1.0, 1.0),
            JointModel {
                name: "slide".to_string(),
                joint_type: JointType::Prismatic {
                    bounds: Some((0.0, 0.5)),
                },
            },
            JointModel {
                name: "base".to_string(),
                joint_type: JointType::Planar,
            },
        ]);
        let bounds = JointSpaceBounds::from_group(&g).unwrap();
        assert_eq!(bounds.len(), 5);
        assert_eq!(bounds.lower()[0], -1.0);
        assert_eq!(bounds.upper()[1], 0.5);
        assert_eq!(bounds.lower()[2], -PLANAR_TRANSLATION_LIMIT);
        assert_eq!(bounds.upper()[4], PI);
    }

    #[test]
    fn test_unbounded_joint_fails() {
        let g = group(vec![JointModel {
            name: "j1".to_string(),
            joint_type: JointType::Revolute { bounds: None },
        }]);
        assert!(matches!(
            JointSpaceBounds::from_group(&g),
            Err(PlanningError::Initialization(_))
        ));
    }

    #[test]
    fn test_inverted_bounds_fail() {
        let g = group(vec![bounded_revolute("j1", 1.0, -1.0)]);
        assert!(JointSpaceBounds::from_group(&g).is_err());
    }

    #[test]
    fn test_zero_theta_rejected() {
        let g = group(vec![bounded_revolute("j1", -1.0, 1.0)]);
        let bounds = JointSpaceBounds::from_group(&g).unwrap();
        assert!(ConstrainedStateSpace::new(0.0, bounds.clone()).is_err());
        assert!(ConstrainedStateSpace::new(-0.5, bounds).is_err());
    }

    #[test]
    fn test_lock_freezes_metadata() {
        let g = group(vec![bounded_revolute("j1", -1.0, 1.0)]);
        let bounds = JointSpaceBounds::from_group(&g).unwrap();
        let mut space = ConstrainedStateSpace::new(1.0, bounds).unwrap();
        let axis = ScrewAxis::new(Vector3::z(), Point3::origin(), 0.0).unwrap();
        let metadata = SpaceMetadata {
            constraint: ScrewConstraintModel::new(axis, Pose::identity(), 1.0),
            ee_frame_name: "tool".to_string(),
            group_name: "arm".to_string(),
        };
        space.set_metadata(metadata.clone()).unwrap();
        space.lock();
        assert!(space.is_locked());
        assert!(space.set_metadata(metadata).is_err());
        assert!(space.metadata().is_some());
    }

    #[test]
    fn test_bounds_membership_and_clamp() {
        let g = group(vec![
            bounded_revolute("j1", -1.0, 1.0),
            bounded_revolute("j2", 0.0, 2.0),
        ]);
        let bounds = JointSpaceBounds::from_group(&g).unwrap();
        assert!(bounds.contains(&[0.5, 1.0]));
        assert!(!bounds.contains(&[1.5, 1.0]));
        assert!(!bounds.contains(&[0.5]));
        let mut q = vec![1.5, -1.0];
        bounds.clamp(&mut q);
        assert_eq!(q, vec![1.0, 0.0]);
    }

    #[test]
    fn test_distance_and_interpolation() {
        let g = group(vec![bounded_revolute("j1", -10.0, 10.0)]);
        let bounds = JointSpaceBounds::from_group(&g).unwrap();
        let space = ConstrainedStateSpace::new(2.0, bounds).unwrap();
        let a = ConstrainedState::new(0.0, vec![0.0]);
        let b = ConstrainedState::new(1.0, vec![1.0]);
        assert!((space.distance(&a, &b) - 2.0_f64.sqrt()).abs() < 1e-12);
        let mid = space.interpolate(&a, &b, 0.5);
        assert!((mid.theta - 0.5).abs() < 1e-12);
        assert!((mid.joints[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_flatten_round_trip() {
        let state = ConstrainedState::new(0.7, vec![1.0, -2.0, 3.0]);
        assert_eq!(ConstrainedState::from_flat(&state.flatten()), state);
    }

    #[test]
    fn test_uniform_samples_stay_in_bounds() {
        let g = group(vec![
            bounded_revolute("j1", -1.0, 1.0),
            bounded_revolute("j2", 2.0, 2.0 + 1e-9),
        ]);
        let bounds = JointSpaceBounds::from_group(&g).unwrap();
        let mut rng = rand::thread_rng();
        let mut q = Vec::new();
        for _ in 0..100 {
            bounds.sample_uniform(&mut rng, &mut q);
            assert!(bounds.contains(&q));
        }
    }
}
