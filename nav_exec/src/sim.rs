//! # Kinematic simulation
//!
//! A holonomic point robot which integrates robot-frame velocity commands.
//! Used by the executable to stand in for the real base and localisation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::geom::{Pose, StampedPose, Twist};
use crate::shaper::twist_to_global_frame;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimRobot {
    /// Pose in the odometry frame
    pose: Pose,

    /// Velocity in the robot frame
    twist: Twist,

    /// Units: seconds
    time_s: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimRobot {
    pub fn new(pose: Pose, start_s: f64) -> Self {
        Self {
            pose,
            twist: Twist::zero(),
            time_s: start_s
        }
    }

    /// Apply `cmd` (robot frame) for `dt_s` seconds.
    pub fn step(&mut self, cmd: &Twist, dt_s: f64) {
        let global = twist_to_global_frame(cmd, self.pose.heading_rad);

        self.pose = Pose::new(
            self.pose.position_m[0] + global.linear_ms[0] * dt_s,
            self.pose.position_m[1] + global.linear_ms[1] * dt_s,
            self.pose.heading_rad + cmd.angular_rads * dt_s
        );
        self.twist = *cmd;
        self.time_s += dt_s;
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    /// The odometry message for the current state: pose in `frame_id` and
    /// twist in the robot frame.
    pub fn odometry(&self, frame_id: &str) -> (StampedPose, Twist) {
        (StampedPose::new(frame_id, self.time_s, self.pose), self.twist)
    }
}
