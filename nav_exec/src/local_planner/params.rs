//! Local planner parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use arc_swap::ArcSwap;
use log::warn;
use serde::Deserialize;
use std::sync::Arc;

// Internal
use crate::controller::ControllerParams;
use crate::motion_planner::MotionPlannerParams;
use crate::safety::SafetyParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters which can be replaced while the planner is running.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LocalPlannerParams {
    /// Distance from the goal under which it is considered reached.
    ///
    /// Units: meters
    pub goal_lin_tolerance_m: f64,

    /// Heading difference from the goal under which it is considered reached.
    ///
    /// Units: radians
    pub goal_ang_tolerance_rad: f64,

    /// Maximum magnitude of the linear command.
    ///
    /// Units: meters/second
    pub max_safe_lin_velocity_ms: f64,

    /// Maximum magnitude of the angular command.
    ///
    /// Units: radians/second
    pub max_safe_ang_velocity_rads: f64,

    /// The limit on the distance from the reference pose. Above this limit
    /// the goal is dropped and replanning is requested.
    ///
    /// Units: meters
    pub max_safe_lin_displacement_m: f64,

    /// The limit on the heading difference from the reference pose. Above
    /// this limit the goal is dropped and replanning is requested.
    ///
    /// Units: radians
    pub max_safe_ang_displacement_rad: f64,

    /// Tags of the safety observers to enable. Only read at initialisation.
    #[serde(default)]
    pub safety_observers: Vec<String>,

    /// Log goal and trajectory events at info level
    #[serde(default)]
    pub verbose: bool
}

/// Full contents of the local planner parameter file.
#[derive(Deserialize, Debug, Clone)]
pub struct LocalPlannerConfig {
    pub planner: LocalPlannerParams,

    #[serde(default)]
    pub safety: SafetyParams,

    pub controller: ControllerParams,

    pub motion_planner: MotionPlannerParams,

    /// Maximum wait for a pose transform to resolve.
    ///
    /// Units: milliseconds
    #[serde(default = "default_transform_timeout_ms")]
    pub transform_timeout_ms: u64
}

/// Shared handle through which new parameters are published.
///
/// Each control tick reads one snapshot, so a replacement never takes effect
/// part way through a tick.
#[derive(Debug, Clone)]
pub struct ParamsHandle {
    current: Arc<ArcSwap<LocalPlannerParams>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Parameter {0} must not be negative or NaN")]
    Negative(&'static str),

    #[error("Parameter {0} must be strictly positive")]
    NotPositive(&'static str)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocalPlannerParams {
    /// Check all limits and tolerances are usable.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let checks = [
            ("goal_lin_tolerance_m", self.goal_lin_tolerance_m),
            ("goal_ang_tolerance_rad", self.goal_ang_tolerance_rad),
            ("max_safe_lin_velocity_ms", self.max_safe_lin_velocity_ms),
            ("max_safe_ang_velocity_rads", self.max_safe_ang_velocity_rads),
            ("max_safe_lin_displacement_m", self.max_safe_lin_displacement_m),
            ("max_safe_ang_displacement_rad", self.max_safe_ang_displacement_rad)
        ];

        for (name, value) in checks.iter() {
            if !(*value >= 0.0) {
                return Err(ParamsError::Negative(*name))
            }
        }

        Ok(())
    }
}

impl Default for LocalPlannerParams {
    fn default() -> Self {
        Self {
            goal_lin_tolerance_m: 0.05,
            goal_ang_tolerance_rad: 0.05,
            max_safe_lin_velocity_ms: 0.5,
            max_safe_ang_velocity_rads: 0.7,
            max_safe_lin_displacement_m: 0.5,
            max_safe_ang_displacement_rad: 1.0,
            safety_observers: Vec::new(),
            verbose: false
        }
    }
}

impl LocalPlannerConfig {
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.planner.validate()?;

        match &self.motion_planner {
            MotionPlannerParams::Linear(p) => {
                if !(p.lin_speed_ms > 0.0) {
                    return Err(ParamsError::NotPositive("motion_planner.lin_speed_ms"))
                }
                if !(p.ang_speed_rads > 0.0) {
                    return Err(ParamsError::NotPositive("motion_planner.ang_speed_rads"))
                }
            }
        }

        Ok(())
    }
}

impl ParamsHandle {
    pub fn new(params: LocalPlannerParams) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(params))
        }
    }

    /// The current parameters.
    pub fn load(&self) -> Arc<LocalPlannerParams> {
        self.current.load_full()
    }

    /// Replace the parameters. Invalid parameters are rejected and the
    /// current ones kept.
    ///
    /// Safety observers are built once at initialisation, so a different
    /// observer list is ignored and the running one kept.
    pub fn apply(&self, mut params: LocalPlannerParams) -> Result<(), ParamsError> {
        params.validate()?;

        let current = self.current.load();
        if params.safety_observers != current.safety_observers {
            warn!(
                "Safety observers cannot be changed while running, keeping {:?}",
                current.safety_observers
            );
            params.safety_observers = current.safety_observers.clone();
        }

        self.current.store(Arc::new(params));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_transform_timeout_ms() -> u64 {
    100
}
