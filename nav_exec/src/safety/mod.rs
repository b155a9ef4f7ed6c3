//! # Safety module
//!
//! The safety supervisor aggregates a set of independent safety observers.
//! Each observer is fed from its own sensor stream by whoever owns that
//! stream, and keeps its last verdict so that the control tick can read it
//! without blocking. If any observer reports unsafe the local planner
//! commands a stop.
//!
//! Observers which have not yet received any data report unsafe.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod arm_skin;
mod params;
mod scan;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use std::sync::Arc;

// Internal
pub use arm_skin::*;
pub use params::*;
pub use scan::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of a safety verdict.
pub trait SafetyObserver: Send + Sync {
    /// The name used to enable this observer in the parameters.
    fn tag(&self) -> &'static str;

    /// The last known verdict. Must not block.
    fn safe(&self) -> bool;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The ensemble of enabled safety observers.
#[derive(Default)]
pub struct SafetySupervisor {
    observers: Vec<Arc<dyn SafetyObserver>>,

    scan: Option<Arc<ScanObserver>>,
    arm_skin: Option<Arc<ArmSkinObserver>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    #[error("Unknown safety observer {0:?}")]
    UnknownObserver(String),

    #[error("Safety observer {0:?} is enabled more than once")]
    DuplicateObserver(String)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SafetySupervisor {
    /// A supervisor with no observers, which is always safe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the supervisor from the list of enabled observer tags.
    pub fn from_tags(tags: &[String], params: &SafetyParams) -> Result<Self, SafetyError> {
        let mut supervisor = Self::new();

        for tag in tags {
            if supervisor.observers.iter().any(|o| o.tag() == tag.as_str()) {
                return Err(SafetyError::DuplicateObserver(tag.clone()))
            }

            match tag.as_str() {
                ScanObserver::TAG => {
                    let obs = Arc::new(ScanObserver::new(params.scan.clone()));
                    supervisor.scan = Some(obs.clone());
                    supervisor.observers.push(obs);
                },
                ArmSkinObserver::TAG => {
                    let obs = Arc::new(ArmSkinObserver::new(params.arm_skin.clone()));
                    supervisor.arm_skin = Some(obs.clone());
                    supervisor.observers.push(obs);
                },
                _ => return Err(SafetyError::UnknownObserver(tag.clone()))
            }

            info!("Safety observer {:?} enabled", tag);
        }

        Ok(supervisor)
    }

    /// Add an externally constructed observer to the ensemble.
    pub fn add_observer(&mut self, observer: Arc<dyn SafetyObserver>) {
        self.observers.push(observer);
    }

    /// True only if every observer currently reports safe.
    pub fn all_safe(&self) -> bool {
        self.observers.iter().all(|o| o.safe())
    }

    /// The tag of the first observer reporting unsafe, if any.
    pub fn first_unsafe(&self) -> Option<&'static str> {
        self.observers.iter().find(|o| !o.safe()).map(|o| o.tag())
    }

    /// Handle to feed laser scans into, if the scan observer is enabled.
    pub fn scan_observer(&self) -> Option<Arc<ScanObserver>> {
        self.scan.clone()
    }

    /// Handle to feed skin pressures into, if the arm skin observer is
    /// enabled.
    pub fn arm_skin_observer(&self) -> Option<Arc<ArmSkinObserver>> {
        self.arm_skin.clone()
    }

    pub fn num_observers(&self) -> usize {
        self.observers.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Flag(AtomicBool);

    impl SafetyObserver for Flag {
        fn tag(&self) -> &'static str {
            "flag"
        }

        fn safe(&self) -> bool {
            self.0.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn test_empty_supervisor_is_safe() {
        assert!(SafetySupervisor::new().all_safe());
    }

    #[test]
    fn test_any_unsafe_vetoes() {
        let a = Arc::new(Flag(AtomicBool::new(true)));
        let b = Arc::new(Flag(AtomicBool::new(true)));

        let mut supervisor = SafetySupervisor::new();
        supervisor.add_observer(a.clone());
        supervisor.add_observer(b.clone());
        assert!(supervisor.all_safe());
        assert_eq!(supervisor.first_unsafe(), None);

        b.0.store(false, Ordering::Relaxed);
        assert!(!supervisor.all_safe());
        assert_eq!(supervisor.first_unsafe(), Some("flag"));

        b.0.store(true, Ordering::Relaxed);
        assert!(supervisor.all_safe());
    }

    #[test]
    fn test_from_tags() {
        let params = SafetyParams::default();

        let supervisor = SafetySupervisor::from_tags(
            &[ScanObserver::TAG.to_string(), ArmSkinObserver::TAG.to_string()],
            &params
        ).unwrap();
        assert_eq!(supervisor.num_observers(), 2);
        assert!(supervisor.scan_observer().is_some());
        assert!(supervisor.arm_skin_observer().is_some());

        // Neither observer has data yet
        assert!(!supervisor.all_safe());

        supervisor.arm_skin_observer().unwrap().update(&[0.0, 0.0]);
        assert_eq!(supervisor.first_unsafe(), Some(ScanObserver::TAG));

        assert!(matches!(
            SafetySupervisor::from_tags(&["bumper".to_string()], &params),
            Err(SafetyError::UnknownObserver(_))
        ));
        assert!(matches!(
            SafetySupervisor::from_tags(
                &[ScanObserver::TAG.to_string(), ScanObserver::TAG.to_string()],
                &params
            ),
            Err(SafetyError::DuplicateObserver(_))
        ));
    }
}
