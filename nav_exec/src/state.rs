//! # Shared robot state
//!
//! The robot state (pose, twist and the time they were valid) is written by
//! the asynchronous pose-update path and read by the control tick. The goal
//! is held under the same lock so that a tick never sees a goal and a pose
//! from different updates.
//!
//! Frame lookups are done before the lock is taken, so the lock is only ever
//! held for a copy in or out.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

// Internal
use crate::geom::{Pose, StampedPose, Twist};
use crate::interfaces::{MapFrameProvider, TransformError, TransformProvider};
use crate::shaper::twist_to_global_frame;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default maximum wait for a transform to resolve.
pub const DEFAULT_TRANSFORM_TIMEOUT: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose and twist of the robot in the control frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RobotState {
    pub pose: Pose,

    /// Velocity expressed in the control frame.
    pub twist: Twist,

    /// Time the pose was valid.
    ///
    /// Units: seconds
    pub stamp_s: f64
}

/// State shared between the pose-update path and the control tick.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<Inner>
}

#[derive(Debug, Default)]
struct Inner {
    /// `None` until the first pose update succeeds
    robot: Option<RobotState>,

    goal: Option<Pose>
}

/// Handle given to the localisation source to push pose updates.
#[derive(Clone)]
pub struct PoseUpdater {
    state: Arc<SharedState>,
    transforms: Arc<dyn TransformProvider>,
    map_frame: Arc<dyn MapFrameProvider>,
    transform_timeout: Duration
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Transform unavailable, pose update dropped: {0}")]
    TransformUnavailable(TransformError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the robot state.
    pub fn set_robot_state(&self, robot: RobotState) {
        self.inner.lock().robot = Some(robot);
    }

    /// A consistent copy of the robot state, or `None` if no pose has been
    /// received yet.
    pub fn snapshot(&self) -> Option<RobotState> {
        self.inner.lock().robot
    }

    /// A consistent copy of both the robot state and the goal.
    pub fn snapshot_with_goal(&self) -> (Option<RobotState>, Option<Pose>) {
        let inner = self.inner.lock();
        (inner.robot, inner.goal)
    }

    pub fn goal(&self) -> Option<Pose> {
        self.inner.lock().goal
    }

    pub fn set_goal(&self, goal: Pose) {
        self.inner.lock().goal = Some(goal);
    }

    pub fn clear_goal(&self) {
        self.inner.lock().goal = None;
    }

    /// If there is a goal and the robot is within the given tolerances of it,
    /// clear the goal and return true.
    ///
    /// The check and the clear happen under one lock, so exactly one caller
    /// observes the goal being reached.
    pub fn clear_goal_if_reached(&self, lin_tol_m: f64, ang_tol_rad: f64) -> bool {
        let mut inner = self.inner.lock();

        let reached = match (inner.robot, inner.goal) {
            (Some(robot), Some(goal)) => 
                robot.pose.linear_distance(&goal) <= lin_tol_m
                &&
                robot.pose.angular_distance(&goal) <= ang_tol_rad,
            _ => false
        };

        if reached {
            inner.goal = None;
        }

        reached
    }
}

impl PoseUpdater {
    pub fn new(
        state: Arc<SharedState>,
        transforms: Arc<dyn TransformProvider>,
        map_frame: Arc<dyn MapFrameProvider>,
        transform_timeout: Duration
    ) -> Self {
        Self {
            state,
            transforms,
            map_frame,
            transform_timeout
        }
    }

    /// Update the robot state from an odometry message.
    ///
    /// `raw_pose` may be in any frame the transform provider can resolve into
    /// the control frame, `robot_twist` is in the robot frame. If the
    /// transform cannot be resolved the previous state is kept.
    pub fn update_pose(
        &self,
        raw_pose: &StampedPose,
        robot_twist: &Twist
    ) -> Result<(), StateError> {
        let map_frame_id = self.map_frame.global_frame_id();

        // Resolve outside the lock, this may block for up to the timeout
        let pose = match self.transforms.transform_pose(
            raw_pose, 
            &map_frame_id, 
            self.transform_timeout
        ) {
            Ok(p) => p,
            Err(e) => {
                warn!("Dropping pose update: {}", e);
                return Err(StateError::TransformUnavailable(e))
            }
        };

        let twist = twist_to_global_frame(robot_twist, pose.heading_rad);

        self.state.set_robot_state(RobotState {
            pose,
            twist,
            stamp_s: raw_pose.stamp_s
        });

        trace!(
            "Pose updated at {:.3} s: ({:.3}, {:.3}, {:.3})",
            raw_pose.stamp_s, pose.position_m[0], pose.position_m[1], pose.heading_rad
        );

        Ok(())
    }
}
