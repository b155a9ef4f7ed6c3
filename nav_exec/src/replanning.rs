//! # Replanning guard
//!
//! A flag shared between the local planner and the global planner which
//! records whether a new global plan is owed. Both sides hold a clone of the
//! same guard, neither owns it.
//!
//! The local planner requests replanning when the robot strays too far from
//! the reference trajectory, and clears the flag when a new goal is accepted
//! or the goal is reached. The global planner requests replanning when it
//! wants a new plan to be taken up. Both sides should react to transitions of
//! the flag rather than assume who last wrote it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering}
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReplanningGuard {
    owed: Arc<AtomicBool>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ReplanningGuard {
    /// Create a new guard. Replanning starts owed since no plan is valid yet.
    pub fn new() -> Self {
        Self {
            owed: Arc::new(AtomicBool::new(true))
        }
    }

    /// Mark a replan as owed.
    pub fn request_replanning(&self) {
        self.owed.store(true, Ordering::Release);
    }

    /// Mark the current plan as valid.
    pub fn clear(&self) {
        self.owed.store(false, Ordering::Release);
    }

    pub fn is_owed(&self) -> bool {
        self.owed.load(Ordering::Acquire)
    }
}

impl Default for ReplanningGuard {
    fn default() -> Self {
        Self::new()
    }
}
