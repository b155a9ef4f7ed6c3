//! Safety observer parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for all safety observers.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SafetyParams {
    #[serde(default)]
    pub scan: ScanObserverParams,

    #[serde(default)]
    pub arm_skin: ArmSkinObserverParams
}

/// Parameters for the laser scan observer.
#[derive(Deserialize, Debug, Clone)]
pub struct ScanObserverParams {
    /// Any valid range reading closer than this is unsafe.
    ///
    /// Units: meters
    pub min_safe_range_m: f64,

    /// Only beams within this angle either side of the scanner's X axis are
    /// checked.
    ///
    /// Units: radians
    pub half_fov_rad: f64
}

/// Parameters for the arm skin observer.
#[derive(Deserialize, Debug, Clone)]
pub struct ArmSkinObserverParams {
    /// Pressure on any taxel above this value is considered a contact.
    pub contact_threshold: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ScanObserverParams {
    fn default() -> Self {
        Self {
            min_safe_range_m: 0.2,
            half_fov_rad: std::f64::consts::PI
        }
    }
}

impl Default for ArmSkinObserverParams {
    fn default() -> Self {
        Self {
            contact_threshold: 0.5
        }
    }
}
