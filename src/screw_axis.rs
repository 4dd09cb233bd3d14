//! Screw axis and the pose constraint model derived from it.
//!
//! A screw motion is a rotation about a fixed axis combined with a
//! proportional translation along that axis (the pitch). The whole commanded
//! motion is parameterized by a single progress angle, so the planner only
//! ever asks one question here: which end-effector pose corresponds to a
//! given progress value.

use crate::kinematic_traits::Pose;
use crate::planning_error::PlanningError;
use nalgebra::{Point3, Translation3, Unit, UnitQuaternion, Vector3};

/// A screw axis: unit direction, a point the axis passes through, and the
/// linear displacement per radian of rotation. Immutable once built.
#[derive(Debug, Clone)]
pub struct ScrewAxis {
    direction: Unit<Vector3<f64>>,
    origin: Point3<f64>,
    pitch: f64,
}

impl ScrewAxis {
    /// Build the axis, normalizing `direction`. A zero or non-finite
    /// direction cannot define an axis and is rejected.
    pub fn new(
        direction: Vector3<f64>,
        origin: Point3<f64>,
        pitch: f64,
    ) -> Result<Self, PlanningError> {
        let norm = direction.norm();
        if !norm.is_finite() || norm < 1e-12 {
            return Err(PlanningError::Initialization(
                "screw axis direction must be a nonzero vector".to_string(),
            ));
        }
        if !pitch.is_finite() || !origin.coords.iter().all(|c| c.is_finite()) {
            return Err(PlanningError::Initialization(
                "screw axis origin and pitch must be finite".to_string(),
            ));
        }
        Ok(ScrewAxis {
            direction: Unit::new_normalize(direction),
            origin,
            pitch,
        })
    }

    pub fn direction(&self) -> &Unit<Vector3<f64>> {
        &self.direction
    }

    pub fn origin(&self) -> &Point3<f64> {
        &self.origin
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Re-express the axis in the planning frame, given the transform of the
    /// frame the axis is currently written in.
    pub fn transformed(&self, frame_to_planning: &Pose) -> ScrewAxis {
        ScrewAxis {
            direction: Unit::new_normalize(frame_to_planning.rotation * self.direction.into_inner()),
            origin: frame_to_planning.transform_point(&self.origin),
            pitch: self.pitch,
        }
    }

    /// The rigid displacement of rotating by `theta` about this axis while
    /// advancing `pitch * theta` along it, expressed in the frame the axis
    /// itself is written in.
    pub fn displacement(&self, theta: f64) -> Pose {
        let rotation = UnitQuaternion::from_axis_angle(&self.direction, theta);
        let translation = self.origin.coords - rotation * self.origin.coords
            + self.direction.into_inner() * (self.pitch * theta);
        Pose::from_parts(Translation3::from(translation), rotation)
    }
}

/// Maps a progress value to the end-effector pose required at that point of
/// the screw motion. Pure function of (axis, start pose, progress); the axis
/// and start pose are cached at construction and never change.
#[derive(Debug, Clone)]
pub struct ScrewConstraintModel {
    axis: ScrewAxis,
    start_pose: Pose,
    theta_max: f64,
}

impl ScrewConstraintModel {
    /// `axis` must already be expressed in the planning frame;
    /// `start_pose` is the end-effector pose at zero progress.
    pub fn new(axis: ScrewAxis, start_pose: Pose, theta_max: f64) -> Self {
        ScrewConstraintModel {
            axis,
            start_pose,
            theta_max,
        }
    }

    /// The end-effector pose after `theta` radians of progress along the
    /// screw. `pose_at(0)` is the start pose.
    pub fn pose_at(&self, theta: f64) -> Pose {
        self.axis.displacement(theta) * self.start_pose
    }

    /// The pose at full commanded progress.
    pub fn goal_pose(&self) -> Pose {
        self.pose_at(self.theta_max)
    }

    pub fn start_pose(&self) -> &Pose {
        &self.start_pose
    }

    pub fn theta_max(&self) -> f64 {
        self.theta_max
    }

    pub fn axis(&self) -> &ScrewAxis {
        &self.axis
    }
}
