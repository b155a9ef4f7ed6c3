//! # Linear motion planner
//!
//! Moves the reference along the straight segments joining consecutive
//! waypoints at constant velocity. Each segment is given the time it takes to
//! cover both its length at the nominal linear speed and its heading change at
//! the nominal turn rate, whichever is longer, so that the reference never
//! asks for more than either nominal speed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector2;

// Internal
use super::{LinearMotionPlannerParams, MotionPlanner};
use crate::geom::{Pose, Twist};
use util::maths::{get_ang_dist, wrap_to_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LinearMotionPlanner {
    params: LinearMotionPlannerParams,

    waypoints: Vec<Pose>,

    /// Time from the trajectory origin at which each waypoint is reached.
    timing_s: Vec<f64>,

    /// Time at which the first waypoint is (or would be) left. `None` until
    /// the first trajectory is loaded.
    origin_s: Option<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LinearMotionPlanner {
    pub fn new(params: LinearMotionPlannerParams) -> Self {
        Self {
            params,
            waypoints: Vec::new(),
            timing_s: Vec::new(),
            origin_s: None
        }
    }

    /// Total time needed to traverse the trajectory.
    pub fn duration_s(&self) -> f64 {
        self.timing_s.last().copied().unwrap_or(0.0)
    }

    /// The time at which the current trajectory started.
    pub fn origin_s(&self) -> Option<f64> {
        self.origin_s
    }

    /// Time taken to go from `a` to `b`.
    fn segment_duration(&self, a: &Pose, b: &Pose) -> f64 {
        let dist_m = a.linear_distance(b);
        let ang_rad = a.angular_distance(b);

        let lin_s = if dist_m > 0.0 { dist_m / self.params.lin_speed_ms } else { 0.0 };
        let ang_s = if ang_rad > 0.0 { ang_rad / self.params.ang_speed_rads } else { 0.0 };

        lin_s.max(ang_s)
    }

    /// Replace the waypoints and recompute the time at which each one is
    /// reached.
    fn retime(&mut self, waypoints: &[Pose]) {
        self.waypoints = waypoints.to_vec();
        self.timing_s = Vec::with_capacity(waypoints.len());

        let mut t_s = 0.0;
        for (i, wp) in waypoints.iter().enumerate() {
            if i > 0 {
                t_s += self.segment_duration(&waypoints[i - 1], wp);
            }
            self.timing_s.push(t_s);
        }
    }

    /// Time from the origin of the point on the trajectory closest to
    /// `position_m`.
    fn progress_at(&self, position_m: &Vector2<f64>) -> f64 {
        let mut best_dist_m = std::f64::INFINITY;
        let mut best_time_s = 0.0;

        for i in 1..self.waypoints.len() {
            let start = self.waypoints[i - 1].position_m;
            let seg = self.waypoints[i].position_m - start;
            let len_sq = seg.norm_squared();

            // Fraction along the segment of the perpendicular foot, held to
            // the segment itself
            let frac = if len_sq > 0.0 {
                ((position_m - start).dot(&seg) / len_sq).clamp(0.0, 1.0)
            }
            else {
                0.0
            };

            let dist_m = (position_m - (start + seg * frac)).norm();
            if dist_m < best_dist_m {
                best_dist_m = dist_m;
                best_time_s = self.timing_s[i - 1] 
                    + frac * (self.timing_s[i] - self.timing_s[i - 1]);
            }
        }

        best_time_s
    }
}

impl MotionPlanner for LinearMotionPlanner {
    fn reset(&mut self, waypoints: &[Pose], start_s: f64) {
        self.retime(waypoints);
        self.origin_s = Some(start_s);

        debug!(
            "Linear trajectory of {} waypoints starting at {:.3} s, duration {:.3} s", 
            self.waypoints.len(), start_s, self.duration_s()
        );
    }

    fn update(&mut self, waypoints: &[Pose], stamp_s: f64) {
        if self.origin_s.is_none() || self.waypoints.is_empty() {
            return self.reset(waypoints, stamp_s)
        }

        // Carry the current reference over onto the new waypoints by shifting
        // the origin so the new trajectory passes closest to it now
        let (ref_pose, _) = self.compute_reference(stamp_s);
        self.retime(waypoints);
        let progress_s = self.progress_at(&ref_pose.position_m);
        self.origin_s = Some(stamp_s - progress_s);

        debug!(
            "Linear trajectory updated to {} waypoints, progress {:.3} s of {:.3} s",
            self.waypoints.len(), progress_s, self.duration_s()
        );
    }

    fn compute_reference(&self, time_s: f64) -> (Pose, Twist) {
        let (first, last) = match (self.waypoints.first(), self.waypoints.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return (Pose::default(), Twist::zero())
        };

        let elapsed_s = match self.origin_s {
            Some(o) => time_s - o,
            None => return (first, Twist::zero())
        };

        if elapsed_s < 0.0 {
            return (first, Twist::zero())
        }

        // Zero length segments are never selected since their end time equals
        // their start time
        for i in 1..self.waypoints.len() {
            if elapsed_s < self.timing_s[i] {
                let start = &self.waypoints[i - 1];
                let target = &self.waypoints[i];
                let dur_s = self.timing_s[i] - self.timing_s[i - 1];
                let frac = (elapsed_s - self.timing_s[i - 1]) / dur_s;

                let delta_m = target.position_m - start.position_m;
                let delta_rad = get_ang_dist(start.heading_rad, target.heading_rad);

                let pose = Pose {
                    position_m: start.position_m + delta_m * frac,
                    heading_rad: wrap_to_pi(start.heading_rad + delta_rad * frac)
                };
                let twist = Twist {
                    linear_ms: delta_m / dur_s,
                    angular_rads: delta_rad / dur_s
                };

                return (pose, twist)
            }
        }

        (last, Twist::zero())
    }

    fn waypoints(&self) -> &[Pose] {
        &self.waypoints
    }
}
