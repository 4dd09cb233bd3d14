//! The seam between the orchestrator and the sampling-based search
//! algorithm. The orchestrator prepares a [`SearchProblem`] and depends only
//! on the [`SearchAlgorithm`] trait; which global planner actually runs
//! behind it is interchangeable as long as it consumes the same sampler and
//! validity-checker contract.

use crate::goal::GoalRegion;
use crate::sampling::{StateSampler, ValidityChecker};
use crate::state_space::{ConstrainedState, ConstrainedStateSpace};
use std::sync::Arc;
use std::time::Duration;

/// Everything a search algorithm needs for one query: the locked space, the
/// start states (all at zero progress), the goal region (all at full
/// progress), the validity checker, and a factory producing fresh samplers so
/// the algorithm can allocate as many as its internals want.
pub struct SearchProblem {
    pub space: Arc<ConstrainedStateSpace>,
    pub starts: Vec<ConstrainedState>,
    pub goal: GoalRegion,
    pub checker: Box<dyn ValidityChecker>,
    pub sampler_factory: Box<dyn Fn() -> Box<dyn StateSampler>>,
}

/// An ordered path through the constrained space, as returned by the search.
#[derive(Debug, Clone)]
pub struct SolvedPath {
    pub states: Vec<ConstrainedState>,
}

impl SolvedPath {
    /// Total length in the space metric.
    pub fn length(&self, space: &ConstrainedStateSpace) -> f64 {
        self.states
            .windows(2)
            .map(|pair| space.distance(&pair[0], &pair[1]))
            .sum()
    }
}

/// A global sampling-based planner, viewed as an opaque blocking call with a
/// wall-clock budget.
pub trait SearchAlgorithm {
    /// Search for a path from any start state into the goal region. Returns
    /// `None` when no solution was found within `budget`.
    fn solve(&self, problem: &SearchProblem, budget: Duration) -> Option<SolvedPath>;

    /// Bounded-time simplification pass over a solved path, in place. Must
    /// keep the endpoints and must not introduce invalid segments.
    fn simplify(&self, problem: &SearchProblem, path: &mut SolvedPath, budget: Duration);

    /// The algorithm's native resolution: the state-space distance below
    /// which it considers two states directly connectable. Trajectory
    /// extraction densifies solved paths down to this spacing.
    fn resolution(&self) -> f64;
}
