//! # Local planner module
//!
//! The local planner keeps the robot on the trajectory handed over by the
//! global planner. Each control tick it:
//!
//!  1. Checks the safety supervisor, commanding a stop if any observer
//!     reports unsafe.
//!  1. Asks the motion planner for the reference pose and twist at the time
//!     of the latest robot state.
//!  1. Checks the robot is close enough to the reference. If not the goal is
//!     dropped and a replan is requested from the global planner.
//!  1. Passes the pose and twist errors through the feedback controller,
//!     rotates the result into the robot frame and saturates it.
//!
//! Pose updates arrive asynchronously through a [`PoseUpdater`] and are held
//! in the shared state, alongside the goal.
//!
//! [`PoseUpdater`]: crate::state::PoseUpdater

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

use crate::interfaces::SinkError;
use crate::safety::SafetyError;
use util::params::LoadError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum LocalPlannerError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Could not initialise the safety supervisor: {0}")]
    SafetyInitError(#[from] SafetyError),

    /// Attempted to set a plan with no waypoints.
    #[error("Attempted to set an empty plan")]
    EmptyPlan,

    /// Attempted to control the trajectory before any pose has been received.
    #[error("No pose has been received")]
    NoPose,

    /// The robot is too far from the reference. The goal has been dropped
    /// and replanning requested.
    #[error(
        "Robot is {lin_displacement_m:.3} m, {ang_displacement_rad:.3} rad from the \
        reference trajectory, replanning requested"
    )]
    TrajectoryDeviation {
        lin_displacement_m: f64,
        ang_displacement_rad: f64
    },

    #[error("Could not send the command: {0}")]
    CommandSinkError(SinkError)
}

/// Execution mode of the local planner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LocalPlannerMode {
    /// No goal is set
    Idle,

    /// A goal is set and its trajectory is being followed
    Tracking
}

/// What `set_plan` did with the waypoints it was given.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// No replan was owed so the current plan was kept.
    Ignored,

    /// The terminal waypoint is a new goal, the trajectory was restarted.
    NewGoal,

    /// Same goal as before, only the trajectory waypoints were replaced.
    TrajectoryUpdated
}
