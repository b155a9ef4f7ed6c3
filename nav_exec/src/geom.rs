//! # Geometry types
//!
//! Planar poses and twists used throughout the local planner. All quantities
//! are on the XY plane of whichever frame they are expressed in, which for
//! everything past the pose-update path is the global control frame.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use util::maths::{get_ang_dist, wrap_to_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A planar pose.
///
/// Build with [`Pose::new`] so the heading is normalised, deserialisation
/// goes through it as well.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawPose")]
pub struct Pose {
    /// Position of the robot.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading (angle to the positive X axis), always in (-pi, pi].
    ///
    /// Units: radians
    pub heading_rad: f64
}

/// Serialised form of a pose, heading not yet normalised.
#[derive(Deserialize)]
struct RawPose {
    position_m: Vector2<f64>,
    heading_rad: f64
}

/// A planar velocity.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    /// Linear velocity.
    ///
    /// Units: meters/second
    pub linear_ms: Vector2<f64>,

    /// Angular velocity about Z, positive anticlockwise.
    ///
    /// Units: radians/second
    pub angular_rads: f64
}

/// A pose tagged with the frame it is expressed in and the time it was valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedPose {
    pub frame_id: String,

    /// Units: seconds
    pub stamp_s: f64,

    pub pose: Pose
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<RawPose> for Pose {
    fn from(raw: RawPose) -> Self {
        Self::new(raw.position_m[0], raw.position_m[1], raw.heading_rad)
    }
}

impl Pose {
    /// Create a new pose, normalising the heading into (-pi, pi].
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad: wrap_to_pi(heading_rad)
        }
    }

    /// Unit vector pointing along the heading.
    pub fn forward(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// Euclidian distance between the positions of the two poses.
    pub fn linear_distance(&self, other: &Pose) -> f64 {
        (other.position_m - self.position_m).norm()
    }

    /// Absolute shortest angle between the headings of the two poses.
    pub fn angular_distance(&self, other: &Pose) -> f64 {
        get_ang_dist(self.heading_rad, other.heading_rad).abs()
    }
}

impl Twist {
    pub fn new(vx_ms: f64, vy_ms: f64, angular_rads: f64) -> Self {
        Self {
            linear_ms: Vector2::new(vx_ms, vy_ms),
            angular_rads
        }
    }

    /// The zero twist, i.e. a stop command.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.linear_ms[0] == 0.0 && self.linear_ms[1] == 0.0 && self.angular_rads == 0.0
    }
}

impl StampedPose {
    pub fn new(frame_id: &str, stamp_s: f64, pose: Pose) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            stamp_s,
            pose
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_deserialised_heading_normalised() {
        let pose: Pose = serde_json::from_str(
            r#"{"position_m": [1.0, 2.0], "heading_rad": 7.0}"#
        ).unwrap();

        assert_eq!(pose.position_m, Vector2::new(1.0, 2.0));
        assert!((pose.heading_rad - (7.0 - 2.0 * PI)).abs() < 1e-12);

        let pose: Pose = serde_json::from_str(
            r#"{"position_m": [0.0, 0.0], "heading_rad": -3.141592653589793}"#
        ).unwrap();
        assert!((pose.heading_rad - PI).abs() < 1e-12);
    }

    #[test]
    fn test_pose_heading_normalised() {
        assert!((Pose::new(0.0, 0.0, 3.0 * PI).heading_rad - PI).abs() < 1e-12);
        assert!((Pose::new(0.0, 0.0, -PI).heading_rad - PI).abs() < 1e-12);
    }

    #[test]
    fn test_distances() {
        let a = Pose::new(0.0, 0.0, PI - 0.05);
        let b = Pose::new(3.0, 4.0, -PI + 0.05);

        assert!((a.linear_distance(&b) - 5.0).abs() < 1e-12);
        assert!((a.angular_distance(&b) - 0.1).abs() < 1e-12);
        assert!((b.angular_distance(&a) - 0.1).abs() < 1e-12);
    }
}
