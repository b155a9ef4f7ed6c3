//! # PID controllers
//!
//! The pose controller runs one PID per axis of the planar pose error (X, Y
//! and heading) and adds the result to the reference twist, which acts as a
//! feed-forward term. The derivative term uses the twist error directly
//! rather than differencing the pose error.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{Controller, PidParams};
use crate::geom::{Pose, Twist};
use util::maths::get_ang_dist;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Time the error was last passed in
    prev_time_s: Option<f64>,

    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64
}

/// Pose controller made of one PID per pose axis
#[derive(Debug, Serialize, Clone)]
pub struct PoseController {
    x_ctrl: PidController,
    y_ctrl: PidController,
    head_ctrl: PidController
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            integral: 0f64,
            prev_time_s: None,
            prev_error: None
        }
    }

    /// Clear the integral and derivative history, starting the next
    /// integration step from `time_s`.
    pub fn reset(&mut self, time_s: f64) {
        self.integral = 0f64;
        self.prev_error = None;
        self.prev_time_s = Some(time_s);
    }

    /// Get the value of the controller for the given error, estimating the
    /// error rate from the previous call.
    pub fn get(&mut self, time_s: f64, error: f64) -> f64 {
        let rate = match (self.prev_error, self.dt(time_s)) {
            (Some(e), Some(dt)) => (error - e) / dt,
            _ => 0f64
        };

        self.get_with_rate(time_s, error, rate)
    }

    /// Get the value of the controller for the given error and known error
    /// rate.
    pub fn get_with_rate(&mut self, time_s: f64, error: f64, error_rate: f64) -> f64 {
        // Accumulate the integral term.
        //
        // If there's no time difference then we don't accumulate the integral,
        // adding the raw error would produce a large spike compared to normal
        // operation.
        if let Some(dt) = self.dt(time_s) {
            self.integral += error * dt;
        }

        let out = 
            self.k_p * error 
            + self.k_i * self.integral 
            + self.k_d * error_rate;

        // Remember the previous error and time
        self.prev_error = Some(error);
        self.prev_time_s = Some(time_s);

        out
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Time since the previous call, `None` if there was no previous call or
    /// time has not moved forwards.
    fn dt(&self, time_s: f64) -> Option<f64> {
        match self.prev_time_s {
            Some(t0) if time_s > t0 => Some(time_s - t0),
            _ => None
        }
    }
}

impl PoseController {

    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &PidParams) -> Self {
        Self {
            x_ctrl: PidController::new(
                params.lin_k_p, params.lin_k_i, params.lin_k_d
            ),
            y_ctrl: PidController::new(
                params.lin_k_p, params.lin_k_i, params.lin_k_d
            ),
            head_ctrl: PidController::new(
                params.ang_k_p, params.ang_k_i, params.ang_k_d
            )
        }
    }
}

impl Controller for PoseController {
    fn reset(&mut self, time_s: f64) {
        self.x_ctrl.reset(time_s);
        self.y_ctrl.reset(time_s);
        self.head_ctrl.reset(time_s);
    }

    fn compute_command(
        &mut self,
        time_s: f64,
        actual_pose: &Pose,
        ref_pose: &Pose,
        actual_twist: &Twist,
        ref_twist: &Twist
    ) -> Twist {
        let pos_err_m = ref_pose.position_m - actual_pose.position_m;
        let head_err_rad = get_ang_dist(actual_pose.heading_rad, ref_pose.heading_rad);

        let vel_err_ms = ref_twist.linear_ms - actual_twist.linear_ms;
        let rate_err_rads = ref_twist.angular_rads - actual_twist.angular_rads;

        let cmd = Twist {
            linear_ms: ref_twist.linear_ms + Vector2::new(
                self.x_ctrl.get_with_rate(time_s, pos_err_m[0], vel_err_ms[0]),
                self.y_ctrl.get_with_rate(time_s, pos_err_m[1], vel_err_ms[1])
            ),
            angular_rads: ref_twist.angular_rads 
                + self.head_ctrl.get_with_rate(time_s, head_err_rad, rate_err_rads)
        };

        trace!(
            "Pose error ({:.3}, {:.3}, {:.3}) -> cmd ({:.3}, {:.3}, {:.3})",
            pos_err_m[0], pos_err_m[1], head_err_rad,
            cmd.linear_ms[0], cmd.linear_ms[1], cmd.angular_rads
        );

        cmd
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn params() -> PidParams {
        PidParams {
            lin_k_p: 1.0,
            lin_k_i: 0.1,
            lin_k_d: 0.2,
            ang_k_p: 2.0,
            ang_k_i: 0.0,
            ang_k_d: 0.0
        }
    }

    #[test]
    fn test_pid_terms() {
        let mut pid = PidController::new(2.0, 1.0, 0.5);
        pid.reset(0.0);

        // One second of error 1.0 integrates to 1.0, rate from the first
        // sample is unknown so zero
        assert!((pid.get(1.0, 1.0) - 3.0).abs() < 1e-12);

        // Error rose by 1 in 0.5 s
        let out = pid.get(1.5, 2.0);
        assert!((pid.integral() - 2.0).abs() < 1e-12);
        assert!((out - (4.0 + 2.0 + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_pid_no_time_step() {
        let mut pid = PidController::new(1.0, 1.0, 1.0);

        // No previous time so nothing accumulates
        assert!((pid.get(5.0, 1.0) - 1.0).abs() < 1e-12);

        // Same time again, still nothing accumulates
        assert!((pid.get(5.0, 1.0) - 1.0).abs() < 1e-12);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_zero_error_gives_zero_command() {
        let mut ctrl = PoseController::new(&params());
        ctrl.reset(0.0);

        let pose = Pose::new(1.0, 2.0, 0.5);
        for i in 1..50 {
            let cmd = ctrl.compute_command(
                i as f64 * 0.1, &pose, &pose, &Twist::zero(), &Twist::zero()
            );
            assert!(cmd.is_zero());
        }
    }

    #[test]
    fn test_feed_forward() {
        let mut ctrl = PoseController::new(&params());
        ctrl.reset(0.0);

        // On the reference and moving with it, command is the reference
        let pose = Pose::new(1.0, 0.0, 0.0);
        let twist = Twist::new(0.3, 0.0, 0.1);
        let cmd = ctrl.compute_command(0.1, &pose, &pose, &twist, &twist);
        assert!((cmd.linear_ms - twist.linear_ms).norm() < 1e-12);
        assert!((cmd.angular_rads - twist.angular_rads).abs() < 1e-12);
    }

    #[test]
    fn test_error_direction() {
        let mut ctrl = PoseController::new(&params());
        ctrl.reset(0.0);

        // Reference ahead and to the left, heading across the wrap
        let actual = Pose::new(0.0, 0.0, PI - 0.1);
        let reference = Pose::new(0.5, 0.2, -PI + 0.1);
        let cmd = ctrl.compute_command(0.0, &actual, &reference, &Twist::zero(), &Twist::zero());

        assert!(cmd.linear_ms[0] > 0.0);
        assert!(cmd.linear_ms[1] > 0.0);

        // Shortest turn is anticlockwise through pi
        assert!((cmd.angular_rads - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_integral() {
        let mut ctrl = PidController::new(0.0, 1.0, 0.0);
        ctrl.reset(0.0);
        ctrl.get(1.0, 1.0);
        assert!(ctrl.integral() > 0.0);

        ctrl.reset(1.0);
        assert_eq!(ctrl.integral(), 0.0);
        assert_eq!(ctrl.get(1.0, 1.0), 0.0);
    }
}
