//! Arm skin contact observer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};

// Internal
use super::{ArmSkinObserverParams, SafetyObserver};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Reports unsafe while any taxel of the arm's tactile skin is in contact.
#[derive(Debug)]
pub struct ArmSkinObserver {
    params: ArmSkinObserverParams,
    safe: AtomicBool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmSkinObserver {
    pub const TAG: &'static str = "arm_skin_observer";

    pub fn new(params: ArmSkinObserverParams) -> Self {
        Self {
            params,
            safe: AtomicBool::new(false)
        }
    }

    /// Update the verdict from the latest taxel pressures.
    pub fn update(&self, pressures: &[f64]) {
        let contact = pressures
            .iter()
            .position(|p| *p > self.params.contact_threshold);

        let was_safe = self.safe.swap(contact.is_none(), Ordering::AcqRel);

        match contact {
            Some(i) if was_safe => warn!("Arm skin contact on taxel {}", i),
            None if !was_safe => info!("Arm skin contact released"),
            _ => ()
        }
    }
}

impl SafetyObserver for ArmSkinObserver {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn safe(&self) -> bool {
        self.safe.load(Ordering::Acquire)
    }
}
