//! Helper functions

use nalgebra::{Isometry3, UnitQuaternion};

/// Print joint values, converting radians to degrees.
#[allow(dead_code)]
pub fn dump_joints(joints: &[f64]) {
    let mut row_str = String::new();
    for q in joints {
        row_str.push_str(&format!("{:5.2} ", q.to_degrees()));
    }
    println!("[{}]", row_str.trim_end());
}

pub fn dump_pose(isometry: &Isometry3<f64>) {
    let translation = isometry.translation.vector;
    let rotation: UnitQuaternion<f64> = isometry.rotation;
    println!(
        "x: {:.5}, y: {:.5}, z: {:.5},  quat: {:.5},{:.5},{:.5},{:.5}",
        translation.x, translation.y, translation.z, rotation.i, rotation.j, rotation.k, rotation.w
    );
}

/// Translational and angular gap between two poses, as a
/// `(distance, angle)` pair in meters and radians.
pub fn pose_distance(ta: &Isometry3<f64>, tb: &Isometry3<f64>) -> (f64, f64) {
    let translation_distance = (ta.translation.vector - tb.translation.vector).norm();
    let angular_distance = ta.rotation.angle_to(&tb.rotation);
    (translation_distance, angular_distance)
}

/// Euclidean distance between two joint vectors of the same length.
pub fn joints_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Normalize an angle into [-PI, PI).
pub fn normalize_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    (angle + PI).rem_euclid(2.0 * PI) - PI
}
