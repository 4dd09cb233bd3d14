//! Failure taxonomy of the screw planner.

use thiserror::Error;

/// Flat failure taxonomy of [`crate::screw_planner::ScrewPlanner::plan`].
///
/// A successful plan returns the response directly; there is no
/// partial-success code here. Partial completion is reported inside the
/// response (`trajectory_is_valid == false` with `percentage_complete < 1`).
/// Local, expected failures (one IK attempt missing, one sample rejected) are
/// swallowed silently and never surface as errors; only exhaustion of a retry
/// or time budget produces one of these.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// State space or constraint construction could not proceed (unbounded
    /// joint, unknown frame, degenerate screw). Not worth retrying as is.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Candidate generation produced no usable start or goal configuration
    /// within its retry budget. Retrying with a different start pose or
    /// configuration may succeed.
    #[error("no IK solution: {0}")]
    NoIkSolution(String),

    /// Valid candidates existed but the search algorithm found no connecting
    /// path within its time budget. Retrying with a larger budget or fresh
    /// candidate seeds may succeed.
    #[error("planning failed: {0}")]
    PlanningFail(String),
}
