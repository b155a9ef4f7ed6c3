//! # Reference motion planner module
//!
//! A motion planner turns the waypoint sequence handed over by the global
//! planner into a time-indexed reference: for any time it gives the pose the
//! robot should be at and the velocity it should be moving with.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod linear;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use linear::*;
pub use params::*;

use crate::geom::{Pose, Twist};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait MotionPlanner: Send {
    /// Discard the current trajectory and start a new one through
    /// `waypoints`, beginning at `start_s`.
    fn reset(&mut self, waypoints: &[Pose], start_s: f64);

    /// Replace the waypoints of the current trajectory without losing
    /// progress along it. `stamp_s` is the time of the update.
    fn update(&mut self, waypoints: &[Pose], stamp_s: f64);

    /// Reference pose and twist (in the control frame) at `time_s`.
    fn compute_reference(&self, time_s: f64) -> (Pose, Twist);

    /// The waypoints of the current trajectory.
    fn waypoints(&self) -> &[Pose];
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the motion planner selected in the parameters.
pub fn from_params(params: &MotionPlannerParams) -> Box<dyn MotionPlanner> {
    match params {
        MotionPlannerParams::Linear(p) => Box::new(LinearMotionPlanner::new(p.clone()))
    }
}
