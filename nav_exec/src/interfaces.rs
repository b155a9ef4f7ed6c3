//! # External interfaces
//!
//! Traits for everything the local planner talks to but does not own: the
//! frame transform provider, the occupancy map's global frame, the actuation
//! command sink and the optional telemetry sink.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Rotation2;
use std::time::Duration;

// Internal
use crate::geom::{Pose, StampedPose, Twist};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Resolves poses from an arbitrary source frame into a target frame.
pub trait TransformProvider: Send + Sync {
    /// Transform `pose` into `target_frame`, waiting at most `timeout` for the
    /// transform to become available.
    fn transform_pose(
        &self,
        pose: &StampedPose,
        target_frame: &str,
        timeout: Duration
    ) -> Result<Pose, TransformError>;
}

/// Supplies the name of the global control frame (the occupancy map frame).
pub trait MapFrameProvider: Send + Sync {
    fn global_frame_id(&self) -> String;
}

/// Receives the shaped command once per successful control tick.
pub trait CommandSink: Send {
    fn send(&mut self, cmd: &Twist) -> Result<(), SinkError>;
}

/// Receives visualisation data. Failures here never affect control.
pub trait TelemetrySink: Send {
    /// The reference pose computed in the current tick.
    fn publish_reference(
        &mut self, frame_id: &str, stamp_s: f64, ref_pose: &Pose
    ) -> Result<(), SinkError>;

    /// The waypoints of a newly accepted trajectory.
    fn publish_trajectory(
        &mut self, frame_id: &str, stamp_s: f64, waypoints: &[Pose]
    ) -> Result<(), SinkError>;

    /// The command issued in the current tick along with the pose it was
    /// computed at.
    fn publish_command(
        &mut self, frame_id: &str, stamp_s: f64, actuation_pose: &Pose, cmd: &Twist
    ) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single fixed transform between a source frame and a target frame.
///
/// Poses already in the target frame are passed through unchanged.
#[derive(Debug, Clone)]
pub struct StaticTransform {
    target_frame: String,
    source_frame: String,

    /// Pose of the source frame's origin in the target frame.
    offset: Pose
}

/// A map frame provider which always returns the same frame.
#[derive(Debug, Clone)]
pub struct FixedMapFrame(pub String);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("No transform from {source_frame:?} into {target_frame:?} is available")]
    Unavailable {
        source_frame: String,
        target_frame: String
    },

    #[error("Timed out after {0:?} waiting for the transform")]
    Timeout(Duration)
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink is disconnected")]
    Disconnected,

    #[error("Sink IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not serialize the data: {0}")]
    Serialization(#[from] serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StaticTransform {
    pub fn new(target_frame: &str, source_frame: &str, offset: Pose) -> Self {
        Self {
            target_frame: target_frame.to_string(),
            source_frame: source_frame.to_string(),
            offset
        }
    }

    /// A transform which only accepts poses already in `frame`.
    pub fn identity(frame: &str) -> Self {
        Self::new(frame, frame, Pose::default())
    }
}

impl TransformProvider for StaticTransform {
    fn transform_pose(
        &self,
        pose: &StampedPose,
        target_frame: &str,
        _timeout: Duration
    ) -> Result<Pose, TransformError> {
        if pose.frame_id == target_frame {
            return Ok(pose.pose)
        }

        if pose.frame_id != self.source_frame || target_frame != self.target_frame {
            return Err(TransformError::Unavailable {
                source_frame: pose.frame_id.clone(),
                target_frame: target_frame.to_string()
            })
        }

        let rot = Rotation2::new(self.offset.heading_rad);

        Ok(Pose::new(
            self.offset.position_m[0] + (rot * pose.pose.position_m)[0],
            self.offset.position_m[1] + (rot * pose.pose.position_m)[1],
            self.offset.heading_rad + pose.pose.heading_rad
        ))
    }
}

impl MapFrameProvider for FixedMapFrame {
    fn global_frame_id(&self) -> String {
        self.0.clone()
    }
}
