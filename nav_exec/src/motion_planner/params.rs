//! Motion planner parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Selects the motion planner and holds its parameters.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionPlannerParams {
    Linear(LinearMotionPlannerParams)
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the linear motion planner
#[derive(Deserialize, Debug, Clone)]
pub struct LinearMotionPlannerParams {
    /// Nominal speed along the trajectory.
    ///
    /// Units: meters/second
    pub lin_speed_ms: f64,

    /// Nominal turn rate along the trajectory.
    ///
    /// Units: radians/second
    pub ang_speed_rads: f64
}
