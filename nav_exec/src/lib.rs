//! # Navigation library.
//!
//! Closed-loop local trajectory control. The local planner takes a plan from
//! the global planner, turns it into a time-indexed reference and tracks that
//! reference using live pose feedback, issuing velocity commands bounded by
//! a set of independent safety observers.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Feedback controllers - convert the pose error into a velocity command
pub mod controller;

/// Planar geometry types shared by all modules
pub mod geom;

/// Traits for the transform provider, map frame, command sink and telemetry
pub mod interfaces;

/// Local planner - goal tracking and the control loop
pub mod local_planner;

/// Motion planners - convert waypoints into a time-indexed reference
pub mod motion_planner;

/// Replanning guard - shared flag telling the global planner a replan is owed
pub mod replanning;

/// Safety observers and their supervisor
pub mod safety;

/// Frame conversion and velocity limiting of commands
pub mod shaper;

/// Kinematic simulation of the base
pub mod sim;

/// Shared robot state written by the localisation source
pub mod state;

/// JSON telemetry sink
pub mod telemetry;
