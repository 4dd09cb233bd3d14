//! A planar serial arm implementing the robot model collaborator traits.
//!
//! All joints are revolute about z and all links lie in the z = 0 plane, so
//! forward and inverse kinematics are closed form. This is the reference
//! robot the examples and the test suite run the planner against; a real
//! robot stack plugs in through the same [`GroupKinematics`] trait.

use crate::kinematic_traits::{GroupKinematics, JointGroup, JointModel, JointType, JointVector, Pose};
use crate::utils::{joints_distance, normalize_angle};
use nalgebra::{Point3, Translation3, UnitQuaternion, Vector3};
use parry3d::query::distance;
use parry3d::shape::{Ball, Segment};

/// Positional slack accepted when deciding whether a pose is reachable.
const REACH_TOLERANCE: f64 = 1e-6;

/// A circular obstacle in the arm plane.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub center: Point3<f64>,
    pub radius: f64,
}

/// Serial arm of 1 to 3 revolute joints about z, rooted at the origin.
pub struct PlanarArm {
    group: JointGroup,
    link_lengths: Vec<f64>,
    bounds: Vec<(f64, f64)>,
    ee_frame: String,
    obstacles: Vec<Obstacle>,
}

impl PlanarArm {
    /// One link length and one bounds pair per joint. A link length of zero
    /// makes a pure pivot (the tool spins in place).
    pub fn new(
        group_name: &str,
        ee_frame: &str,
        link_lengths: Vec<f64>,
        bounds: Vec<(f64, f64)>,
    ) -> Self {
        assert_eq!(
            link_lengths.len(),
            bounds.len(),
            "one bounds pair per link expected"
        );
        assert!(
            (1..=3).contains(&link_lengths.len()),
            "planar arm supports 1 to 3 joints"
        );
        let joints = bounds
            .iter()
            .enumerate()
            .map(|(i, (lo, hi))| JointModel {
                name: format!("joint{}", i + 1),
                joint_type: JointType::Revolute {
                    bounds: Some((*lo, *hi)),
                },
            })
            .collect();
        PlanarArm {
            group: JointGroup {
                name: group_name.to_string(),
                joints,
            },
            link_lengths,
            bounds,
            ee_frame: ee_frame.to_string(),
            obstacles: Vec::new(),
        }
    }

    pub fn with_obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.obstacles = obstacles;
        self
    }

    /// Base plus every joint tip, in order.
    fn joint_positions(&self, joints: &[f64]) -> Vec<Point3<f64>> {
        let mut positions = Vec::with_capacity(joints.len() + 1);
        positions.push(Point3::origin());
        let mut angle = 0.0;
        let mut x = 0.0;
        let mut y = 0.0;
        for (q, l) in joints.iter().zip(&self.link_lengths) {
            angle += q;
            x += l * angle.cos();
            y += l * angle.sin();
            positions.push(Point3::new(x, y, 0.0));
        }
        positions
    }

    fn tool_pose(&self, joints: &[f64]) -> Pose {
        let positions = self.joint_positions(joints);
        let tip = positions[positions.len() - 1];
        let yaw: f64 = joints.iter().sum();
        Pose::from_parts(
            Translation3::from(tip.coords),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw),
        )
    }

    /// Split a pose into (x, y, yaw) if it stays in the arm plane.
    fn planar_components(pose: &Pose) -> Option<(f64, f64, f64)> {
        if pose.translation.vector.z.abs() > REACH_TOLERANCE {
            return None;
        }
        let scaled_axis = pose.rotation.scaled_axis();
        if scaled_axis.x.abs() > REACH_TOLERANCE || scaled_axis.y.abs() > REACH_TOLERANCE {
            return None;
        }
        Some((pose.translation.vector.x, pose.translation.vector.y, scaled_axis.z))
    }

    fn within_bounds(&self, joints: &[f64]) -> bool {
        joints
            .iter()
            .zip(&self.bounds)
            .all(|(q, (lo, hi))| *q >= *lo && *q <= *hi)
    }

    /// IK of the one-joint arm: the yaw is the joint angle; the position must
    /// follow from it.
    fn ik_one(&self, x: f64, y: f64, yaw: f64) -> Option<JointVector> {
        let q1 = normalize_angle(yaw);
        let reached = Point3::new(self.link_lengths[0] * q1.cos(), self.link_lengths[0] * q1.sin(), 0.0);
        if (reached.coords - Vector3::new(x, y, 0.0)).norm() > 1e-4 {
            return None;
        }
        let solution = vec![q1];
        self.within_bounds(&solution).then_some(solution)
    }

    /// IK of the two-joint arm: yaw fixes the second joint's absolute angle,
    /// leaving a single solution if the wrist circle is reachable.
    fn ik_two(&self, x: f64, y: f64, yaw: f64) -> Option<JointVector> {
        let (l1, l2) = (self.link_lengths[0], self.link_lengths[1]);
        let wx = x - l2 * yaw.cos();
        let wy = y - l2 * yaw.sin();
        let r = (wx * wx + wy * wy).sqrt();
        if (r - l1).abs() > 1e-4 {
            return None;
        }
        let q1 = normalize_angle(wy.atan2(wx));
        let q2 = normalize_angle(yaw - q1);
        let solution = vec![q1, q2];
        self.within_bounds(&solution).then_some(solution)
    }

    /// IK of the three-joint arm: classic planar wrist decomposition with two
    /// elbow branches; the branch closer to the seed wins.
    fn ik_three(&self, x: f64, y: f64, yaw: f64, seed: &[f64]) -> Option<JointVector> {
        let (l1, l2, l3) = (
            self.link_lengths[0],
            self.link_lengths[1],
            self.link_lengths[2],
        );
        let wx = x - l3 * yaw.cos();
        let wy = y - l3 * yaw.sin();
        let r2 = wx * wx + wy * wy;
        let mut cos_elbow = (r2 - l1 * l1 - l2 * l2) / (2.0 * l1 * l2);
        if cos_elbow.abs() > 1.0 + 1e-9 {
            return None;
        }
        cos_elbow = cos_elbow.clamp(-1.0, 1.0);
        let elbow = cos_elbow.acos();

        let mut best: Option<JointVector> = None;
        let mut best_distance = f64::INFINITY;
        for q2 in [elbow, -elbow] {
            let q1 = normalize_angle(wy.atan2(wx) - (l2 * q2.sin()).atan2(l1 + l2 * q2.cos()));
            let q2 = normalize_angle(q2);
            let q3 = normalize_angle(yaw - q1 - q2);
            let candidate = vec![q1, q2, q3];
            if !self.within_bounds(&candidate) {
                continue;
            }
            let candidate_distance = if seed.len() == 3 {
                joints_distance(&candidate, seed)
            } else {
                0.0
            };
            if candidate_distance < best_distance {
                best_distance = candidate_distance;
                best = Some(candidate);
            }
        }
        best
    }
}

impl GroupKinematics for PlanarArm {
    fn group(&self) -> &JointGroup {
        &self.group
    }

    fn frame_transform(&self, joints: &[f64], frame: &str) -> Option<Pose> {
        if frame != self.ee_frame || joints.len() != self.link_lengths.len() {
            return None;
        }
        Some(self.tool_pose(joints))
    }

    fn solve_ik(&self, target: &Pose, seed: &[f64], ee_frame: &str) -> Option<JointVector> {
        if ee_frame != self.ee_frame {
            return None;
        }
        let (x, y, yaw) = Self::planar_components(target)?;
        match self.link_lengths.len() {
            1 => self.ik_one(x, y, yaw),
            2 => self.ik_two(x, y, yaw),
            3 => self.ik_three(x, y, yaw, seed),
            _ => None,
        }
    }

    fn collision_free(&self, joints: &[f64]) -> bool {
        if joints.len() != self.link_lengths.len() {
            return false;
        }
        if self.obstacles.is_empty() {
            return true;
        }
        let identity = nalgebra::Isometry3::<f32>::identity();
        let positions = self.joint_positions(joints);
        for pair in positions.windows(2) {
            let link = Segment::new(
                Point3::new(pair[0].x as f32, pair[0].y as f32, pair[0].z as f32),
                Point3::new(pair[1].x as f32, pair[1].y as f32, pair[1].z as f32),
            );
            for obstacle in &self.obstacles {
                let ball = Ball::new(obstacle.radius as f32);
                let placement = nalgebra::Isometry3::translation(
                    obstacle.center.x as f32,
                    obstacle.center.y as f32,
                    obstacle.center.z as f32,
                );
                match distance(&identity, &link, &placement, &ball) {
                    Ok(d) if d > 0.0 => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pose_distance;
    use std::f64::consts::PI;

    fn three_r() -> PlanarArm {
        PlanarArm::new(
            "arm",
            "tool",
            vec![0.5, 0.5, 0.3],
            vec![(-PI, PI), (-PI, PI), (-PI, PI)],
        )
    }

    #[test]
    fn test_forward_kinematics_stretched() {
        let arm = three_r();
        let pose = arm.frame_transform(&[0.0, 0.0, 0.0], "tool").unwrap();
        assert!((pose.translation.vector - Vector3::new(1.3, 0.0, 0.0)).norm() < 1e-12);
        assert!(pose.rotation.angle() < 1e-12);
    }

    #[test]
    fn test_forward_kinematics_folded() {
        let arm = three_r();
        // First joint straight up, elbow folding back level: the last two
        // links run horizontally half a meter up.
        let pose = arm.frame_transform(&[PI / 2.0, -PI / 2.0, 0.0], "tool").unwrap();
        assert!((pose.translation.vector - Vector3::new(0.8, 0.5, 0.0)).norm() < 1e-9);
        assert!((pose.rotation.scaled_axis().z - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_frame() {
        let arm = three_r();
        assert!(arm.frame_transform(&[0.0, 0.0, 0.0], "elbow").is_none());
        assert!(arm
            .solve_ik(&Pose::identity(), &[0.0, 0.0, 0.0], "elbow")
            .is_none());
    }

    #[test]
    fn test_ik_round_trip() {
        let arm = three_r();
        let joints = [0.4, -0.8, 0.3];
        let pose = arm.frame_transform(&joints, "tool").unwrap();
        let solution = arm.solve_ik(&pose, &joints, "tool").unwrap();
        let again = arm.frame_transform(&solution, "tool").unwrap();
        let (d, angle) = pose_distance(&pose, &again);
        assert!(d < 1e-6 && angle < 1e-6);
        // With the exact seed, IK lands on the same branch.
        assert!(joints_distance(&solution, &joints) < 1e-6);
    }

    #[test]
    fn test_ik_finds_both_elbow_branches() {
        let arm = three_r();
        let joints = [0.4, -0.8, 0.3];
        let pose = arm.frame_transform(&joints, "tool").unwrap();
        let near = arm.solve_ik(&pose, &[0.4, -0.8, 0.3], "tool").unwrap();
        // Seed on the mirrored branch: the elbow flips.
        let far = arm.solve_ik(&pose, &[0.0, 0.8, -0.8], "tool").unwrap();
        assert!((near[1] + 0.8).abs() < 1e-6);
        assert!((far[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_ik_unreachable() {
        let arm = three_r();
        let pose = Pose::from_parts(
            Translation3::new(5.0, 0.0, 0.0),
            UnitQuaternion::identity(),
        );
        assert!(arm.solve_ik(&pose, &[0.0, 0.0, 0.0], "tool").is_none());
        // Out of plane.
        let lifted = Pose::from_parts(
            Translation3::new(0.8, 0.0, 0.5),
            UnitQuaternion::identity(),
        );
        assert!(arm.solve_ik(&lifted, &[0.0, 0.0, 0.0], "tool").is_none());
    }

    #[test]
    fn test_pivot_ik() {
        let arm = PlanarArm::new("arm", "tool", vec![0.0], vec![(-PI, PI)]);
        let pose = Pose::from_parts(
            Translation3::new(0.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7),
        );
        let solution = arm.solve_ik(&pose, &[0.0], "tool").unwrap();
        assert!((solution[0] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_collision_detection() {
        let arm = PlanarArm::new("arm", "tool", vec![1.0], vec![(-PI, PI)]).with_obstacles(vec![
            Obstacle {
                center: Point3::new(0.5, 0.0, 0.0),
                radius: 0.1,
            },
        ]);
        assert!(!arm.collision_free(&[0.0]));
        assert!(arm.collision_free(&[PI / 2.0]));
        // Slightly grazing counts as a hit.
        let grazing = (0.1_f64 / 0.5).asin() * 0.99;
        assert!(!arm.collision_free(&[grazing]));
    }

    #[test]
    fn test_bounds_reject_solutions() {
        let arm = PlanarArm::new("arm", "tool", vec![0.0], vec![(0.0, 1.0)]);
        let pose = Pose::from_parts(
            Translation3::new(0.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -0.5),
        );
        assert!(arm.solve_ik(&pose, &[0.0], "tool").is_none());
    }
}
