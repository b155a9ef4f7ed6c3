//! Laser scan safety observer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

// Internal
use super::{SafetyObserver, ScanObserverParams};
use util::maths::wrap_to_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A planar laser scan, beams ordered by increasing angle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaserScan {
    /// Units: seconds
    pub stamp_s: f64,

    /// Angle of the first beam relative to the scanner X axis.
    ///
    /// Units: radians
    pub angle_min_rad: f64,

    /// Units: radians
    pub angle_increment_rad: f64,

    /// Readings outside [range_min_m, range_max_m] are invalid.
    ///
    /// Units: meters
    pub range_min_m: f64,
    pub range_max_m: f64,

    /// Units: meters
    pub ranges_m: Vec<f64>
}

/// Reports unsafe when an obstacle is inside the safety radius.
#[derive(Debug)]
pub struct ScanObserver {
    params: ScanObserverParams,
    safe: AtomicBool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScanObserver {
    pub const TAG: &'static str = "scan_safety_observer";

    pub fn new(params: ScanObserverParams) -> Self {
        Self {
            params,
            safe: AtomicBool::new(false)
        }
    }

    /// Update the verdict from a new scan.
    ///
    /// A scan with no usable beam in the field of view is treated as no
    /// data and is unsafe.
    pub fn update(&self, scan: &LaserScan) {
        let mut closest_m = std::f64::INFINITY;
        let mut num_valid = 0usize;

        for (i, range_m) in scan.ranges_m.iter().enumerate() {
            // Scanners may publish angles in [0, 2pi), so wrap before comparing
            let angle_rad = wrap_to_pi(
                scan.angle_min_rad + (i as f64) * scan.angle_increment_rad
            );

            if angle_rad.abs() > self.params.half_fov_rad {
                continue;
            }

            // NaN fails both comparisons and so is skipped as well
            if !(*range_m >= scan.range_min_m && *range_m <= scan.range_max_m) {
                continue;
            }

            num_valid += 1;
            closest_m = closest_m.min(*range_m);
        }

        let safe = num_valid > 0 && closest_m >= self.params.min_safe_range_m;
        let was_safe = self.safe.swap(safe, Ordering::AcqRel);

        if was_safe && !safe {
            if num_valid == 0 {
                warn!(
                    "Scan at {:.3} s has no valid readings in the field of view", 
                    scan.stamp_s
                );
            }
            else {
                warn!(
                    "Obstacle at {:.3} m, inside the {:.3} m safety range", 
                    closest_m, self.params.min_safe_range_m
                );
            }
        }
        else if !was_safe && safe {
            info!("Scan safety range is clear");
        }
    }
}

impl SafetyObserver for ScanObserver {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn safe(&self) -> bool {
        self.safe.load(Ordering::Acquire)
    }
}
