//! # Feedback controller module
//!
//! A controller computes the velocity command, in the control frame, which
//! drives the robot towards the reference pose given by the motion planner.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod pid;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use pid::*;

use crate::geom::{Pose, Twist};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait Controller: Send {
    /// Clear any accumulated state. `time_s` is the time from which the next
    /// command will be integrated.
    fn reset(&mut self, time_s: f64);

    /// Compute the command twist in the control frame.
    fn compute_command(
        &mut self,
        time_s: f64,
        actual_pose: &Pose,
        ref_pose: &Pose,
        actual_twist: &Twist,
        ref_twist: &Twist
    ) -> Twist;
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the controller selected in the parameters.
pub fn from_params(params: &ControllerParams) -> Box<dyn Controller> {
    match params {
        ControllerParams::Pid(p) => Box::new(PoseController::new(p))
    }
}
