//! Bounded-retry generation of start and goal configuration pools.
//!
//! Inverse kinematics from a random seed is a lottery ticket, not a function
//! call: it may fail outright or land on any solution branch. The generator
//! therefore buys a fixed number of tickets per pool and keeps every distinct
//! win. Individual failed attempts are not errors; only an empty pool at the
//! end of the budget is.

use crate::kinematic_traits::{GroupKinematics, JointVector, Pose};
use crate::planning_error::PlanningError;
use crate::state_space::ConstrainedStateSpace;
use crate::utils::joints_distance;
use std::sync::Arc;
use tracing::debug;

/// Joint-space distance under which two IK solutions count as the same
/// configuration.
pub const DUPLICATE_DISTANCE: f64 = 0.05;

/// Collects pools of distinct joint configurations reaching the start and
/// goal poses. Owns a reusable scratch buffer that plays the role of the
/// mutable kinematic state: every IK attempt reads it as the seed, successful
/// attempts write their solution back into it, and randomized re-seeding
/// overwrites it between attempts. Not shareable across concurrent plans.
pub struct CandidateGenerator {
    space: Arc<ConstrainedStateSpace>,
    kinematics: Arc<dyn GroupKinematics>,
    ee_frame: String,
    pub duplicate_distance: f64,
    seed_scratch: Vec<f64>,
}

impl CandidateGenerator {
    pub fn new(
        space: Arc<ConstrainedStateSpace>,
        kinematics: Arc<dyn GroupKinematics>,
        ee_frame: &str,
    ) -> Self {
        CandidateGenerator {
            space,
            kinematics,
            ee_frame: ee_frame.to_string(),
            duplicate_distance: DUPLICATE_DISTANCE,
            seed_scratch: Vec::new(),
        }
    }

    /// Start-given mode: the supplied configuration becomes the whole start
    /// pool and only goal configurations are searched for, seeded first from
    /// the start configuration itself and then from random positions. Up to
    /// `2 * num_goal` attempts are made; the result never holds duplicates.
    pub fn find_goal_states(
        &mut self,
        start_joint_state: &[f64],
        goal_pose: &Pose,
        num_goal: usize,
    ) -> Result<(Vec<JointVector>, Vec<JointVector>), PlanningError> {
        let expected = self.kinematics.group().variable_count();
        if start_joint_state.len() != expected {
            return Err(PlanningError::NoIkSolution(format!(
                "start configuration has {} variables, group '{}' expects {}",
                start_joint_state.len(),
                self.kinematics.group().name,
                expected
            )));
        }

        let start_configs = vec![start_joint_state.to_vec()];
        let mut goal_configs: Vec<JointVector> = Vec::with_capacity(num_goal);

        // The first attempt continues from the start configuration; solutions
        // near it are the most likely to be connectable.
        self.seed_scratch.clear();
        self.seed_scratch.extend_from_slice(start_joint_state);

        let mut i = 0;
        while goal_configs.len() < num_goal && i < 2 * num_goal {
            self.increase_state_list(goal_pose, &mut goal_configs);
            self.reseed_random();
            i += 1;
        }
        debug!(
            goals = goal_configs.len(),
            attempts = i,
            "goal candidate generation finished"
        );

        if goal_configs.is_empty() {
            return Err(PlanningError::NoIkSolution(
                "no goal configuration found within the retry budget".to_string(),
            ));
        }
        Ok((start_configs, goal_configs))
    }

    /// Start-and-goal mode: no starting configuration is known, so both pools
    /// are filled by interleaved IK attempts at the start and goal poses from
    /// shared random seeds, within a combined budget of
    /// `2 * (num_start + num_goal)` iterations.
    pub fn find_start_goal_states(
        &mut self,
        start_pose: &Pose,
        goal_pose: &Pose,
        num_start: usize,
        num_goal: usize,
    ) -> Result<(Vec<JointVector>, Vec<JointVector>), PlanningError> {
        if num_start < 1 || num_goal < 1 {
            return Err(PlanningError::NoIkSolution(
                "requested candidate pool sizes must be at least 1".to_string(),
            ));
        }

        let mut start_configs: Vec<JointVector> = Vec::with_capacity(num_start);
        let mut goal_configs: Vec<JointVector> = Vec::with_capacity(num_goal);

        let mut i = 0;
        while (start_configs.len() < num_start || goal_configs.len() < num_goal)
            && i < 2 * (num_goal + num_start)
        {
            self.reseed_random();
            i += 1;

            if start_configs.len() < num_start {
                self.increase_state_list(start_pose, &mut start_configs);
            }
            if goal_configs.len() < num_goal {
                self.increase_state_list(goal_pose, &mut goal_configs);
            }
        }
        debug!(
            starts = start_configs.len(),
            goals = goal_configs.len(),
            attempts = i,
            "start/goal candidate generation finished"
        );

        if start_configs.is_empty() || goal_configs.is_empty() {
            return Err(PlanningError::NoIkSolution(format!(
                "candidate generation exhausted its budget with {} start and {} goal configurations",
                start_configs.len(),
                goal_configs.len()
            )));
        }
        Ok((start_configs, goal_configs))
    }

    /// One IK ticket: solve at `pose` from the current scratch seed and keep
    /// the solution unless an equivalent configuration is already pooled. A
    /// successful solve also becomes the next seed, like a mutable kinematic
    /// state that remembers where IK left it.
    fn increase_state_list(&mut self, pose: &Pose, state_list: &mut Vec<JointVector>) {
        let Some(solution) = self
            .kinematics
            .solve_ik(pose, &self.seed_scratch, &self.ee_frame)
        else {
            return;
        };
        self.seed_scratch.clear();
        self.seed_scratch.extend_from_slice(&solution);
        if !self.is_duplicate(&solution, state_list) {
            state_list.push(solution);
        }
    }

    fn is_duplicate(&self, candidate: &[f64], state_list: &[JointVector]) -> bool {
        state_list
            .iter()
            .any(|kept| joints_distance(candidate, kept) < self.duplicate_distance)
    }

    fn reseed_random(&mut self) {
        let mut rng = rand::thread_rng();
        self.space
            .bounds()
            .sample_uniform(&mut rng, &mut self.seed_scratch);
    }
}
