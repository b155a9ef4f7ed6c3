//! # Command shaping
//!
//! Frame conversion of twists between the global control frame and the robot
//! frame, and saturation of commands to the configured safe velocities.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Rotation2;

use crate::geom::Twist;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Rotate a twist expressed in the robot frame into the global frame, given
/// the robot heading in the global frame.
pub fn twist_to_global_frame(robot_twist: &Twist, heading_rad: f64) -> Twist {
    Twist {
        linear_ms: Rotation2::new(heading_rad) * robot_twist.linear_ms,
        angular_rads: robot_twist.angular_rads
    }
}

/// Rotate a twist expressed in the global frame into the robot frame, given
/// the robot heading in the global frame.
pub fn twist_to_robot_frame(global_twist: &Twist, heading_rad: f64) -> Twist {
    Twist {
        linear_ms: Rotation2::new(-heading_rad) * global_twist.linear_ms,
        angular_rads: global_twist.angular_rads
    }
}

/// Saturate a twist.
///
/// The linear part is uniformly rescaled so its magnitude is at most
/// `max_lin_ms`, keeping its direction. The angular part is clamped to
/// `max_ang_rads` keeping its sign.
pub fn clamp_twist(twist: &Twist, max_lin_ms: f64, max_ang_rads: f64) -> Twist {
    let mut safe = *twist;

    // A zero vector never exceeds the limit so the division is always safe
    let lin_mag = twist.linear_ms.norm();
    if lin_mag > max_lin_ms {
        safe.linear_ms = twist.linear_ms * max_lin_ms / lin_mag;
    }

    if twist.angular_rads.abs() > max_ang_rads {
        safe.angular_rads = max_ang_rads.copysign(twist.angular_rads);
    }

    safe
}
