//! Goal region: "full progress reached, in any of several joint
//! configurations".
//!
//! Inverse kinematics at the goal pose is multi-valued, so the region holds
//! one state per discovered solution branch. Each stored state is a separate
//! basin the search can fall into, which matters for kinematically redundant
//! robots where a single goal configuration may be hard to connect to.

use crate::state_space::{ConstrainedState, ConstrainedStateSpace};
use std::sync::Arc;

/// Distance under which a candidate counts as having reached a goal state.
pub const DEFAULT_GOAL_TOLERANCE: f64 = 1e-4;

/// An ordered set of admissible terminal states, all at full progress.
pub struct GoalRegion {
    space: Arc<ConstrainedStateSpace>,
    states: Vec<ConstrainedState>,
    pub tolerance: f64,
}

impl GoalRegion {
    pub fn new(space: Arc<ConstrainedStateSpace>) -> Self {
        GoalRegion {
            space,
            states: Vec::new(),
            tolerance: DEFAULT_GOAL_TOLERANCE,
        }
    }

    /// Add a terminal joint configuration. The stored state is pinned to full
    /// progress regardless of what `joints` was paired with elsewhere.
    pub fn add_configuration(&mut self, joints: Vec<f64>) {
        self.states
            .push(ConstrainedState::new(self.space.theta_max(), joints));
    }

    pub fn states(&self) -> &[ConstrainedState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Distance from `state` to the nearest stored goal state, in the space
    /// metric. Infinite for an empty region.
    pub fn distance_to(&self, state: &ConstrainedState) -> f64 {
        self.states
            .iter()
            .map(|goal| self.space.distance(state, goal))
            .fold(f64::INFINITY, f64::min)
    }

    /// A state is a goal iff it matches any stored state within tolerance.
    pub fn is_satisfied(&self, state: &ConstrainedState) -> bool {
        self.distance_to(state) <= self.tolerance
    }
}
