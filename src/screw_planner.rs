//! The planning orchestrator: owns the request-to-response control flow and
//! the failure taxonomy, and delegates the actual search to a pluggable
//! global planner.

use crate::candidates::CandidateGenerator;
use crate::goal::GoalRegion;
use crate::kinematic_traits::{FrameGraph, GroupKinematics};
use crate::rrt_connect::RrtConnect;
use crate::planning_error::PlanningError;
use crate::request::{PlanningRequest, PlanningResponse};
use crate::sampling::{
    ScrewSampler, ScrewValidSampler, ScrewValidityChecker, StateSampler,
    DEFAULT_ANGULAR_TOLERANCE, DEFAULT_POSITION_TOLERANCE,
};
use crate::screw_axis::{ScrewAxis, ScrewConstraintModel};
use crate::search::{SearchAlgorithm, SearchProblem};
use crate::state_space::{
    ConstrainedState, ConstrainedStateSpace, JointSpaceBounds, SpaceMetadata,
};
use crate::trajectory::TrajectoryExtractor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Plans joint trajectories that realize commanded screw motions.
///
/// One `plan` call is one self-contained state machine pass: build the
/// constrained space from the request, derive the screw constraint, generate
/// start and goal candidates through inverse kinematics, run the search, and
/// extract the validated trajectory. Nothing persists across calls except
/// the shared read-only robot model; plan one request at a time per instance.
pub struct ScrewPlanner {
    kinematics: Arc<dyn GroupKinematics>,
    frames: Arc<dyn FrameGraph>,
    search: Box<dyn SearchAlgorithm>,

    /// Start configurations requested in start-and-goal mode.
    pub num_start: usize,
    /// Goal configurations requested in either mode.
    pub num_goal: usize,
    /// Wall-clock budget of the search.
    pub solve_budget: Duration,
    /// Wall-clock budget of the path simplification pass.
    pub simplify_budget: Duration,
    /// Positional tolerance of the pose constraint, meters.
    pub position_tolerance: f64,
    /// Angular tolerance of the pose constraint, radians.
    pub angular_tolerance: f64,
    /// Print a per-phase timing summary.
    pub debug: bool,
}

impl ScrewPlanner {
    /// Planner with the bundled RRT-connect as the search algorithm.
    pub fn new(kinematics: Arc<dyn GroupKinematics>, frames: Arc<dyn FrameGraph>) -> Self {
        Self::with_search(kinematics, frames, Box::new(RrtConnect::default()))
    }

    /// Planner with a caller-supplied search algorithm. Any global
    /// sampling-based planner works as long as it consumes the problem's
    /// sampler and validity-checker contract.
    pub fn with_search(
        kinematics: Arc<dyn GroupKinematics>,
        frames: Arc<dyn FrameGraph>,
        search: Box<dyn SearchAlgorithm>,
    ) -> Self {
        ScrewPlanner {
            kinematics,
            frames,
            search,
            num_start: 5,
            num_goal: 10,
            solve_budget: Duration::from_secs(5),
            simplify_budget: Duration::from_secs(1),
            position_tolerance: DEFAULT_POSITION_TOLERANCE,
            angular_tolerance: DEFAULT_ANGULAR_TOLERANCE,
            debug: false,
        }
    }

    /// Plan a trajectory for `request`.
    ///
    /// `Ok` means a trajectory was produced; whether it is complete is
    /// reported inside the response (`trajectory_is_valid`,
    /// `percentage_complete`). The error variants form the flat failure
    /// taxonomy: nothing partial ever rides on an error.
    pub fn plan(&self, request: &PlanningRequest) -> Result<PlanningResponse, PlanningError> {
        let started = Instant::now();
        let mut response = PlanningResponse::failed();

        let group = self.kinematics.group();
        if group.name != request.group_name {
            return Err(PlanningError::Initialization(format!(
                "request targets group '{}' but the robot model plans for '{}'",
                request.group_name, group.name
            )));
        }

        // Compound space: progress dimension plus bounded joint subspace.
        let bounds = JointSpaceBounds::from_group(group)?;
        let mut space = ConstrainedStateSpace::new(request.theta, bounds)?;

        // Resolve the start pose, either from the given configuration or
        // from the given Cartesian pose.
        let start_pose = match &request.start_joint_state {
            Some(start_joints) => {
                if start_joints.len() != group.variable_count() {
                    return Err(PlanningError::NoIkSolution(format!(
                        "start configuration has {} variables, group '{}' expects {}",
                        start_joints.len(),
                        group.name,
                        group.variable_count()
                    )));
                }
                self.kinematics
                    .frame_transform(start_joints, &request.ee_frame_name)
                    .ok_or_else(|| {
                        PlanningError::Initialization(format!(
                            "cannot resolve end-effector frame '{}'",
                            request.ee_frame_name
                        ))
                    })?
            }
            None => request.start_pose.ok_or_else(|| {
                PlanningError::Initialization(
                    "request carries neither a start configuration nor a start pose".to_string(),
                )
            })?,
        };

        // Screw axis into the planning frame; constraint model from it.
        let frame_transform = self
            .frames
            .to_planning_frame(&request.screw.frame_id)
            .ok_or_else(|| {
                PlanningError::Initialization(format!(
                    "unknown screw reference frame '{}'",
                    request.screw.frame_id
                ))
            })?;
        let axis = ScrewAxis::new(request.screw.axis, request.screw.origin, request.screw.pitch)?
            .transformed(&frame_transform);
        let constraint = ScrewConstraintModel::new(axis, start_pose, request.theta);
        let goal_pose = constraint.goal_pose();

        space.set_metadata(SpaceMetadata {
            constraint,
            ee_frame_name: request.ee_frame_name.clone(),
            group_name: group.name.clone(),
        })?;
        space.lock();
        let space = Arc::new(space);

        // Candidate pools through repeated inverse kinematics.
        let mut generator = CandidateGenerator::new(
            space.clone(),
            self.kinematics.clone(),
            &request.ee_frame_name,
        );
        let (start_configs, goal_configs) = match &request.start_joint_state {
            Some(start_joints) => {
                generator.find_goal_states(start_joints, &goal_pose, self.num_goal)?
            }
            None => generator.find_start_goal_states(
                &start_pose,
                &goal_pose,
                self.num_start,
                self.num_goal,
            )?,
        };
        debug!(
            starts = start_configs.len(),
            goals = goal_configs.len(),
            "candidate pools ready"
        );

        // Starts enter at zero progress; the goal region sits at full
        // progress, one state per discovered IK branch.
        let starts: Vec<ConstrainedState> = start_configs
            .into_iter()
            .map(|q| ConstrainedState::new(0.0, q))
            .collect();
        let mut goal = GoalRegion::new(space.clone());
        for configuration in goal_configs {
            goal.add_configuration(configuration);
        }

        let checker = ScrewValidityChecker::new(space.clone(), self.kinematics.clone())?
            .with_tolerances(self.position_tolerance, self.angular_tolerance);

        let factory_space = space.clone();
        let factory_kinematics = self.kinematics.clone();
        let (position_tolerance, angular_tolerance) =
            (self.position_tolerance, self.angular_tolerance);
        let sampler_factory: Box<dyn Fn() -> Box<dyn StateSampler>> = Box::new(move || {
            // The space was locked with its metadata in place, so these
            // cannot fail anymore.
            let inner = ScrewSampler::new(factory_space.clone(), factory_kinematics.clone())
                .expect("locked state space lost its metadata");
            let checker =
                ScrewValidityChecker::new(factory_space.clone(), factory_kinematics.clone())
                    .expect("locked state space lost its metadata")
                    .with_tolerances(position_tolerance, angular_tolerance);
            Box::new(ScrewValidSampler::new(inner, Box::new(checker)))
        });

        let problem = SearchProblem {
            space: space.clone(),
            starts,
            goal,
            checker: Box::new(checker),
            sampler_factory,
        };

        let Some(mut path) = self.search.solve(&problem, self.solve_budget) else {
            return Err(PlanningError::PlanningFail(format!(
                "no path found within {:?}",
                self.solve_budget
            )));
        };
        self.search
            .simplify(&problem, &mut path, self.simplify_budget);

        let extractor = TrajectoryExtractor::new(
            space.clone(),
            problem.checker.as_ref(),
            self.search.resolution(),
        );
        extractor.extract(&path, group.variable_names(), &mut response);

        if self.debug {
            println!(
                "Screw plan took {:?}: {} waypoints, {:.1}% complete",
                started.elapsed(),
                response.joint_trajectory.points.len(),
                100.0 * response.percentage_complete
            );
        }
        Ok(response)
    }
}
