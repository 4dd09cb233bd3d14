use anyhow::{Context, Result};
use nalgebra::{Point3, Vector3};
use rs_screw_planning::kinematic_traits::{GroupKinematics, PlanningFrameOnly};
use rs_screw_planning::planar_arm::PlanarArm;
use rs_screw_planning::request::{PlanningRequest, ScrewSpec};
use rs_screw_planning::screw_planner::ScrewPlanner;
use rs_screw_planning::utils::{dump_joints, dump_pose};
use std::f64::consts::PI;
use std::sync::Arc;

/// Usage example: a three-joint planar arm turns a valve, i.e. rotates its
/// tool one radian about the vertical axis through the tool's own position.
fn main() -> Result<()> {
    let arm = PlanarArm::new(
        "arm",
        "tool",
        vec![0.5, 0.5, 0.3],
        vec![(-PI, PI), (-PI, PI), (-PI, PI)],
    );

    let start_joints = vec![0.3, -0.6, 0.3];
    let tool = arm
        .frame_transform(&start_joints, "tool")
        .context("tool frame must be known to the arm")?;
    println!("Tool pose at the start configuration:");
    dump_pose(&tool);

    let request = PlanningRequest {
        screw: ScrewSpec {
            frame_id: "world".to_string(),
            origin: Point3::from(tool.translation.vector),
            axis: Vector3::z(),
            pitch: 0.0,
        },
        theta: 1.0,
        ee_frame_name: "tool".to_string(),
        group_name: "arm".to_string(),
        start_joint_state: Some(start_joints),
        start_pose: None,
    };

    let frames = PlanningFrameOnly {
        planning_frame: "world".to_string(),
    };
    let mut planner = ScrewPlanner::new(Arc::new(arm), Arc::new(frames));
    // The planar arm is a toy; loose tolerances keep the example snappy.
    planner.position_tolerance = 0.02;
    planner.angular_tolerance = 5.0_f64.to_radians();
    planner.debug = true;

    let response = planner.plan(&request)?;
    println!(
        "Planned {} waypoints, complete: {:.1}%, valid: {}, path length {:.3}",
        response.joint_trajectory.points.len(),
        100.0 * response.percentage_complete,
        response.trajectory_is_valid,
        response.path_length
    );
    for point in &response.joint_trajectory.points {
        dump_joints(&point.positions);
    }
    Ok(())
}
