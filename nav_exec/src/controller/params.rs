//! Feedback controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Selects the controller and holds its parameters.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerParams {
    Pid(PidParams)
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains for the PID pose controller
#[derive(Deserialize, Debug, Clone)]
pub struct PidParams {
    /// Linear (X and Y) controller proportional gain
    pub lin_k_p: f64,

    /// Linear (X and Y) controller integral gain
    pub lin_k_i: f64,

    /// Linear (X and Y) controller derivative gain
    pub lin_k_d: f64,

    /// Heading controller proportional gain
    pub ang_k_p: f64,

    /// Heading controller integral gain
    pub ang_k_i: f64,

    /// Heading controller derivative gain
    pub ang_k_d: f64
}
