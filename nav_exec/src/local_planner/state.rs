//! Local planner module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

// Internal
use super::*;
use crate::{
    controller::{self, Controller},
    geom::{Pose, Twist},
    interfaces::{CommandSink, MapFrameProvider, TelemetrySink, TransformProvider},
    motion_planner::{self, MotionPlanner},
    replanning::ReplanningGuard,
    safety::SafetySupervisor,
    shaper::{clamp_twist, twist_to_robot_frame},
    state::{PoseUpdater, RobotState, SharedState}
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Terminal waypoints closer than this to the current goal, in both position
/// and heading, are treated as the same goal.
pub const NEW_GOAL_EPSILON: f64 = 1e-8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything the local planner talks to but does not own.
pub struct Collaborators {
    pub transforms: Arc<dyn TransformProvider>,
    pub map_frame: Arc<dyn MapFrameProvider>,
    pub cmd_sink: Box<dyn CommandSink>,
    pub telemetry: Option<Box<dyn TelemetrySink>>,

    /// Guard shared with the global planner
    pub replanning: ReplanningGuard
}

pub struct LocalPlanner {
    params: ParamsHandle,

    /// Robot state and goal, shared with the pose-update path
    state: Arc<SharedState>,

    pose_updater: PoseUpdater,

    map_frame: Arc<dyn MapFrameProvider>,

    safety: SafetySupervisor,
    replanning: ReplanningGuard,

    controller: Box<dyn Controller>,
    motion_planner: Box<dyn MotionPlanner>,

    cmd_sink: Box<dyn CommandSink>,
    telemetry: Option<Box<dyn TelemetrySink>>
}

/// The status report containing various monitoring quantities for one tick.
#[derive(Debug, Default, Copy, Clone)]
pub struct StatusReport {
    /// Tag of the observer which vetoed the command, if any
    pub safety_veto: Option<&'static str>,

    /// True if there was no goal to track
    pub idle: bool,

    /// Distance between the robot and the reference pose
    pub lin_displacement_m: f64,

    /// Heading difference between the robot and the reference pose
    pub ang_displacement_rad: f64,

    pub ref_pose: Option<Pose>,
    pub ref_twist: Option<Twist>,

    /// Command from the controller in the control frame, before shaping
    pub raw_cmd: Option<Twist>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocalPlanner {
    /// Initialise the local planner from a parameter file.
    ///
    /// The file path is relative to the params directory.
    pub fn init(
        params_path: &str,
        collaborators: Collaborators
    ) -> Result<Self, LocalPlannerError> {
        let config: LocalPlannerConfig = util::params::load(params_path)
            .map_err(LocalPlannerError::ParamLoadError)?;

        Self::new(&config, collaborators)
    }

    /// Build the local planner with the controller, motion planner and
    /// safety observers selected in the configuration.
    pub fn new(
        config: &LocalPlannerConfig,
        collaborators: Collaborators
    ) -> Result<Self, LocalPlannerError> {
        config.validate()?;

        let safety = SafetySupervisor::from_tags(
            &config.planner.safety_observers, 
            &config.safety
        )?;

        Ok(Self::with_components(
            config.planner.clone(),
            Duration::from_millis(config.transform_timeout_ms),
            safety,
            controller::from_params(&config.controller),
            motion_planner::from_params(&config.motion_planner),
            collaborators
        ))
    }

    /// Build the local planner from already constructed components.
    pub fn with_components(
        params: LocalPlannerParams,
        transform_timeout: Duration,
        safety: SafetySupervisor,
        controller: Box<dyn Controller>,
        motion_planner: Box<dyn MotionPlanner>,
        collaborators: Collaborators
    ) -> Self {
        let state = Arc::new(SharedState::new());
        let pose_updater = PoseUpdater::new(
            state.clone(),
            collaborators.transforms,
            collaborators.map_frame.clone(),
            transform_timeout
        );

        info!(
            "Local planner initialised with {} safety observer(s)", 
            safety.num_observers()
        );

        Self {
            params: ParamsHandle::new(params),
            state,
            pose_updater,
            map_frame: collaborators.map_frame,
            safety,
            replanning: collaborators.replanning,
            controller,
            motion_planner,
            cmd_sink: collaborators.cmd_sink,
            telemetry: collaborators.telemetry
        }
    }

    /// Handle for the localisation source to push pose updates through.
    pub fn pose_updater(&self) -> PoseUpdater {
        self.pose_updater.clone()
    }

    /// Handle for the configuration channel, equivalent to `apply_params`.
    pub fn params_handle(&self) -> ParamsHandle {
        self.params.clone()
    }

    /// Replace the active parameters. Takes effect from the next tick.
    pub fn apply_params(&self, params: LocalPlannerParams) -> Result<(), ParamsError> {
        self.params.apply(params)?;
        debug!("Local planner parameters replaced");

        Ok(())
    }

    pub fn safety(&self) -> &SafetySupervisor {
        &self.safety
    }

    pub fn replanning_guard(&self) -> ReplanningGuard {
        self.replanning.clone()
    }

    pub fn mode(&self) -> LocalPlannerMode {
        match self.state.goal() {
            Some(_) => LocalPlannerMode::Tracking,
            None => LocalPlannerMode::Idle
        }
    }

    pub fn goal(&self) -> Option<Pose> {
        self.state.goal()
    }

    pub fn robot_state(&self) -> Option<RobotState> {
        self.state.snapshot()
    }

    /// Waypoints of the trajectory currently loaded in the motion planner.
    pub fn trajectory(&self) -> &[Pose] {
        self.motion_planner.waypoints()
    }

    /// Set the plan to follow.
    ///
    /// Plans are only taken up while a replan is owed, otherwise they are
    /// ignored so that late replans do not disturb a valid plan. If the last
    /// waypoint differs from the current goal the trajectory is restarted
    /// from the current robot state's time, otherwise the waypoints of the
    /// current trajectory are replaced keeping its progress.
    pub fn set_plan(&mut self, waypoints: &[Pose]) -> Result<PlanOutcome, LocalPlannerError> {
        let terminal = match waypoints.last() {
            Some(p) => *p,
            None => return Err(LocalPlannerError::EmptyPlan)
        };

        if !self.replanning.is_owed() {
            debug!("No replan owed, plan ignored");
            return Ok(PlanOutcome::Ignored)
        }

        let params = self.params.load();
        let stamp_s = self.state.snapshot().map(|s| s.stamp_s).unwrap_or(0.0);

        let new_goal = match self.state.goal() {
            Some(goal) => 
                goal.linear_distance(&terminal) > NEW_GOAL_EPSILON
                ||
                goal.angular_distance(&terminal) > NEW_GOAL_EPSILON,
            None => true
        };

        let outcome = if new_goal {
            self.state.set_goal(terminal);
            self.controller.reset(stamp_s);
            self.motion_planner.reset(waypoints, stamp_s);
            self.replanning.clear();

            if params.verbose {
                info!(
                    "New goal ({:.3}, {:.3}, {:.3}) with {} waypoints",
                    terminal.position_m[0], terminal.position_m[1], terminal.heading_rad,
                    waypoints.len()
                );
            }

            PlanOutcome::NewGoal
        }
        else {
            self.motion_planner.update(waypoints, stamp_s);
            debug!("Trajectory updated with {} waypoints", waypoints.len());

            PlanOutcome::TrajectoryUpdated
        };

        let frame_id = self.map_frame.global_frame_id();
        if let Some(t) = self.telemetry.as_mut() {
            if let Err(e) = t.publish_trajectory(&frame_id, stamp_s, self.motion_planner.waypoints()) {
                warn!("Could not publish the trajectory: {}", e);
            }
        }

        Ok(outcome)
    }

    /// Run one control tick.
    ///
    /// On success the command sent to the command sink is returned. A safety
    /// veto or having no goal both give a zero command. If the robot has
    /// strayed too far from the reference no command is sent and
    /// `TrajectoryDeviation` is returned, the caller must replan.
    pub fn compute_velocity_commands(
        &mut self
    ) -> Result<(Twist, StatusReport), LocalPlannerError> {
        let params = self.params.load();
        let mut report = StatusReport::default();

        // ---- SAFETY ----

        if let Some(tag) = self.safety.first_unsafe() {
            report.safety_veto = Some(tag);
            let cmd = Twist::zero();
            self.send_command(&cmd)?;
            return Ok((cmd, report))
        }

        let (robot, goal) = self.state.snapshot_with_goal();
        let robot = robot.ok_or(LocalPlannerError::NoPose)?;

        if goal.is_none() {
            report.idle = true;
            let cmd = Twist::zero();
            self.send_command(&cmd)?;
            return Ok((cmd, report))
        }

        // ---- REFERENCE ----

        let frame_id = self.map_frame.global_frame_id();
        let stamp_s = robot.stamp_s;

        let (ref_pose, ref_twist) = self.motion_planner.compute_reference(stamp_s);
        if let Some(t) = self.telemetry.as_mut() {
            if let Err(e) = t.publish_reference(&frame_id, stamp_s, &ref_pose) {
                warn!("Could not publish the reference pose: {}", e);
            }
        }

        report.ref_pose = Some(ref_pose);
        report.ref_twist = Some(ref_twist);
        report.lin_displacement_m = robot.pose.linear_distance(&ref_pose);
        report.ang_displacement_rad = robot.pose.angular_distance(&ref_pose);

        if report.lin_displacement_m > params.max_safe_lin_displacement_m
            ||
            report.ang_displacement_rad > params.max_safe_ang_displacement_rad
        {
            warn!("The robot is too far from the planned trajectory, replanning requested");

            self.state.clear_goal();
            self.replanning.request_replanning();
            self.controller.reset(stamp_s);

            return Err(LocalPlannerError::TrajectoryDeviation {
                lin_displacement_m: report.lin_displacement_m,
                ang_displacement_rad: report.ang_displacement_rad
            })
        }

        // ---- COMMAND GENERATION ----

        let map_cmd = self.controller.compute_command(
            stamp_s, &robot.pose, &ref_pose, &robot.twist, &ref_twist
        );
        report.raw_cmd = Some(map_cmd);

        let robot_cmd = twist_to_robot_frame(&map_cmd, robot.pose.heading_rad);
        let cmd = clamp_twist(
            &robot_cmd, 
            params.max_safe_lin_velocity_ms, 
            params.max_safe_ang_velocity_rads
        );

        self.send_command(&cmd)?;

        if let Some(t) = self.telemetry.as_mut() {
            if let Err(e) = t.publish_command(&frame_id, stamp_s, &robot.pose, &cmd) {
                warn!("Could not publish the command: {}", e);
            }
        }

        Ok((cmd, report))
    }

    /// Check whether the goal has been reached.
    ///
    /// Returns true once when the robot comes within tolerance of the goal,
    /// at which point the goal is cleared and the planner becomes idle.
    pub fn is_goal_reached(&mut self) -> bool {
        let params = self.params.load();

        if !self.state.clear_goal_if_reached(
            params.goal_lin_tolerance_m, 
            params.goal_ang_tolerance_rad
        ) {
            return false
        }

        self.replanning.clear();

        if params.verbose {
            info!("Goal reached");
        }

        true
    }

    fn send_command(&mut self, cmd: &Twist) -> Result<(), LocalPlannerError> {
        self.cmd_sink.send(cmd).map_err(LocalPlannerError::CommandSinkError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        controller::{ControllerParams, PidParams},
        geom::StampedPose,
        interfaces::{FixedMapFrame, SinkError, StaticTransform},
        motion_planner::{LinearMotionPlannerParams, MotionPlannerParams},
        safety::{ArmSkinObserver, SafetyParams},
        sim::SimRobot
    };
    use parking_lot::Mutex;
    use std::f64::consts::FRAC_PI_2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<Twist>>>);

    impl CommandSink for RecordingSink {
        fn send(&mut self, cmd: &Twist) -> Result<(), SinkError> {
            self.0.lock().push(*cmd);
            Ok(())
        }
    }

    /// Telemetry which always fails, control must not care
    struct BrokenTelemetry;

    impl TelemetrySink for BrokenTelemetry {
        fn publish_reference(&mut self, _: &str, _: f64, _: &Pose) -> Result<(), SinkError> {
            Err(SinkError::Disconnected)
        }

        fn publish_trajectory(&mut self, _: &str, _: f64, _: &[Pose]) -> Result<(), SinkError> {
            Err(SinkError::Disconnected)
        }

        fn publish_command(
            &mut self, _: &str, _: f64, _: &Pose, _: &Twist
        ) -> Result<(), SinkError> {
            Err(SinkError::Disconnected)
        }
    }

    fn config(safety_observers: &[&str]) -> LocalPlannerConfig {
        LocalPlannerConfig {
            planner: LocalPlannerParams {
                safety_observers: safety_observers.iter().map(|s| s.to_string()).collect(),
                ..LocalPlannerParams::default()
            },
            safety: SafetyParams::default(),
            controller: ControllerParams::Pid(PidParams {
                lin_k_p: 1.0,
                lin_k_i: 0.0,
                lin_k_d: 0.1,
                ang_k_p: 1.0,
                ang_k_i: 0.0,
                ang_k_d: 0.1
            }),
            motion_planner: MotionPlannerParams::Linear(LinearMotionPlannerParams {
                lin_speed_ms: 0.5,
                ang_speed_rads: 0.5
            }),
            transform_timeout_ms: 100
        }
    }

    fn planner(safety_observers: &[&str]) -> (LocalPlanner, RecordingSink, ReplanningGuard) {
        let sink = RecordingSink::default();
        let guard = ReplanningGuard::new();

        let planner = LocalPlanner::new(
            &config(safety_observers),
            Collaborators {
                transforms: Arc::new(StaticTransform::identity("map")),
                map_frame: Arc::new(FixedMapFrame("map".into())),
                cmd_sink: Box::new(sink.clone()),
                telemetry: Some(Box::new(BrokenTelemetry)),
                replanning: guard.clone()
            }
        ).unwrap();

        (planner, sink, guard)
    }

    fn set_pose(planner: &LocalPlanner, pose: Pose, stamp_s: f64) {
        planner
            .pose_updater()
            .update_pose(&StampedPose::new("map", stamp_s, pose), &Twist::zero())
            .unwrap();
    }

    #[test]
    fn test_empty_plan_rejected() {
        let (mut planner, _, _) = planner(&[]);
        set_pose(&planner, Pose::new(0.0, 0.0, 0.0), 0.0);

        assert!(matches!(planner.set_plan(&[]), Err(LocalPlannerError::EmptyPlan)));
        assert_eq!(planner.mode(), LocalPlannerMode::Idle);
        assert!(planner.trajectory().is_empty());

        let plan = [Pose::new(0.0, 0.0, 0.0), Pose::new(1.0, 0.0, 0.0)];
        planner.set_plan(&plan).unwrap();

        assert!(matches!(planner.set_plan(&[]), Err(LocalPlannerError::EmptyPlan)));
        assert_eq!(planner.goal(), Some(Pose::new(1.0, 0.0, 0.0)));
        assert_eq!(planner.trajectory(), &plan);
    }

    #[test]
    fn test_goal_reached_once() {
        let (mut planner, _, guard) = planner(&[]);
        set_pose(&planner, Pose::new(0.0, 0.0, 0.0), 0.0);

        let outcome = planner
            .set_plan(&[Pose::new(0.0, 0.0, 0.0), Pose::new(1.0, 0.0, 0.0)])
            .unwrap();
        assert_eq!(outcome, PlanOutcome::NewGoal);
        assert_eq!(planner.mode(), LocalPlannerMode::Tracking);
        assert!(!guard.is_owed());
        assert!(!planner.is_goal_reached());

        // Outside the linear tolerance
        set_pose(&planner, Pose::new(0.9, 0.0, 0.0), 5.0);
        assert!(!planner.is_goal_reached());

        // Outside the angular tolerance
        set_pose(&planner, Pose::new(1.0, 0.0, 0.1), 6.0);
        assert!(!planner.is_goal_reached());

        set_pose(&planner, Pose::new(1.02, 0.0, 0.0), 10.0);
        guard.request_replanning();
        assert!(planner.is_goal_reached());
        assert!(!guard.is_owed());
        assert_eq!(planner.mode(), LocalPlannerMode::Idle);

        assert!(!planner.is_goal_reached());
        assert!(!planner.is_goal_reached());
    }

    #[test]
    fn test_safety_veto_gives_zero_command() {
        let (mut planner, sink, guard) = planner(&[ArmSkinObserver::TAG]);
        set_pose(&planner, Pose::new(0.0, 0.0, 0.0), 0.0);

        // Goal far from the robot, without the veto this tick would deviate
        planner.set_plan(&[Pose::new(5.0, 5.0, 1.0)]).unwrap();

        // No skin data yet so the observer is unsafe
        let (cmd, report) = planner.compute_velocity_commands().unwrap();
        assert!(cmd.is_zero());
        assert_eq!(report.safety_veto, Some(ArmSkinObserver::TAG));
        assert_eq!(planner.mode(), LocalPlannerMode::Tracking);
        assert!(!guard.is_owed());

        let skin = planner.safety().arm_skin_observer().unwrap();
        skin.update(&[1.0]);
        let (cmd, _) = planner.compute_velocity_commands().unwrap();
        assert!(cmd.is_zero());
        assert_eq!(sink.0.lock().len(), 2);
        assert!(sink.0.lock().iter().all(|c| c.is_zero()));

        // Once clear the deviation is caught
        skin.update(&[0.0]);
        assert!(matches!(
            planner.compute_velocity_commands(),
            Err(LocalPlannerError::TrajectoryDeviation { .. })
        ));
    }

    #[test]
    fn test_deviation_requests_replan() {
        let (mut planner, sink, guard) = planner(&[]);
        set_pose(&planner, Pose::new(0.0, 0.0, 0.0), 0.0);

        planner.set_plan(&[Pose::new(0.6, 0.0, 0.0)]).unwrap();
        assert!(!guard.is_owed());

        match planner.compute_velocity_commands() {
            Err(LocalPlannerError::TrajectoryDeviation { lin_displacement_m, .. }) => 
                assert!((lin_displacement_m - 0.6).abs() < 1e-12),
            r => panic!("Expected a deviation, got {:?}", r)
        }

        assert!(planner.goal().is_none());
        assert!(guard.is_owed());
        assert!(sink.0.lock().is_empty());
        assert!(!planner.is_goal_reached());

        // The replan is taken up as a new goal
        assert_eq!(
            planner.set_plan(&[Pose::new(0.0, 0.0, 0.0), Pose::new(0.6, 0.0, 0.0)]).unwrap(),
            PlanOutcome::NewGoal
        );
    }

    #[test]
    fn test_command_shaped_into_robot_frame() {
        let (mut planner, sink, _) = planner(&[]);

        let mut params = LocalPlannerParams::default();
        params.max_safe_lin_velocity_ms = 0.1;
        planner.apply_params(params).unwrap();

        // Facing +Y, trajectory along +X
        set_pose(&planner, Pose::new(0.0, 0.0, FRAC_PI_2), 0.0);
        planner.set_plan(&[Pose::new(0.0, 0.0, FRAC_PI_2), Pose::new(1.0, 0.0, FRAC_PI_2)]).unwrap();

        let (cmd, report) = planner.compute_velocity_commands().unwrap();

        // Feed-forward plus derivative on the twist error
        let raw = report.raw_cmd.unwrap();
        assert!((raw.linear_ms[0] - 0.55).abs() < 1e-9);

        // Moving +X while facing +Y is to the robot's right
        assert!(cmd.linear_ms[0].abs() < 1e-9);
        assert!((cmd.linear_ms[1] + 0.1).abs() < 1e-9);
        assert_eq!(sink.0.lock().last().copied(), Some(cmd));
    }

    #[test]
    fn test_new_goal_and_trajectory_update() {
        let (mut planner, _, guard) = planner(&[]);
        set_pose(&planner, Pose::new(0.0, 0.0, 0.0), 0.0);

        assert_eq!(
            planner.set_plan(&[Pose::new(0.0, 0.0, 0.0), Pose::new(1.0, 0.0, 0.0)]).unwrap(),
            PlanOutcome::NewGoal
        );

        // Nothing owed, later plans are ignored
        assert_eq!(
            planner.set_plan(&[Pose::new(3.0, 0.0, 0.0)]).unwrap(),
            PlanOutcome::Ignored
        );
        assert_eq!(planner.goal(), Some(Pose::new(1.0, 0.0, 0.0)));

        // Same terminal waypoint, only the trajectory changes
        guard.request_replanning();
        let detour = [Pose::new(0.0, 0.0, 0.0), Pose::new(0.5, 0.1, 0.0), Pose::new(1.0, 0.0, 0.0)];
        assert_eq!(planner.set_plan(&detour).unwrap(), PlanOutcome::TrajectoryUpdated);
        assert_eq!(planner.trajectory(), &detour);
        assert_eq!(planner.goal(), Some(Pose::new(1.0, 0.0, 0.0)));

        // Differences within the epsilon are still the same goal
        assert_eq!(
            planner.set_plan(&[Pose::new(1.0 + 1e-9, 0.0, 1e-9)]).unwrap(),
            PlanOutcome::TrajectoryUpdated
        );

        assert_eq!(
            planner.set_plan(&[Pose::new(1.0 + 1e-6, 0.0, 0.0)]).unwrap(),
            PlanOutcome::NewGoal
        );
        assert_eq!(planner.goal(), Some(Pose::new(1.0 + 1e-6, 0.0, 0.0)));
    }

    /// Controller counting its resets, always commanding zero.
    struct CountingController(Arc<AtomicUsize>);

    impl Controller for CountingController {
        fn reset(&mut self, _: f64) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn compute_command(
            &mut self, _: f64, _: &Pose, _: &Pose, _: &Twist, _: &Twist
        ) -> Twist {
            Twist::zero()
        }
    }

    #[test]
    fn test_trajectory_update_keeps_progress() {
        let num_resets = Arc::new(AtomicUsize::new(0));
        let guard = ReplanningGuard::new();
        let config = config(&[]);

        let mut planner = LocalPlanner::with_components(
            config.planner.clone(),
            Duration::from_millis(100),
            SafetySupervisor::new(),
            Box::new(CountingController(num_resets.clone())),
            motion_planner::from_params(&config.motion_planner),
            Collaborators {
                transforms: Arc::new(StaticTransform::identity("map")),
                map_frame: Arc::new(FixedMapFrame("map".into())),
                cmd_sink: Box::new(RecordingSink::default()),
                telemetry: None,
                replanning: guard.clone()
            }
        );

        let ref_x = |planner: &mut LocalPlanner| {
            let (_, report) = planner.compute_velocity_commands().unwrap();
            report.ref_pose.unwrap().position_m[0]
        };

        set_pose(&planner, Pose::new(0.0, 0.0, 0.0), 0.0);
        assert_eq!(
            planner.set_plan(&[Pose::new(0.0, 0.0, 0.0), Pose::new(2.0, 0.0, 0.0)]).unwrap(),
            PlanOutcome::NewGoal
        );
        assert_eq!(num_resets.load(Ordering::SeqCst), 1);

        // One second in at 0.5 m/s
        set_pose(&planner, Pose::new(0.5, 0.0, 0.0), 1.0);
        assert!((ref_x(&mut planner) - 0.5).abs() < 1e-9);

        // Same goal through an extra waypoint, progress is carried over
        guard.request_replanning();
        assert_eq!(
            planner.set_plan(&[
                Pose::new(0.0, 0.0, 0.0), Pose::new(1.0, 0.0, 0.0), Pose::new(2.0, 0.0, 0.0)
            ]).unwrap(),
            PlanOutcome::TrajectoryUpdated
        );
        assert_eq!(num_resets.load(Ordering::SeqCst), 1);
        assert!((ref_x(&mut planner) - 0.5).abs() < 1e-9);
        assert!(guard.is_owed());

        // Heading only change of the goal restarts from the first waypoint now
        assert_eq!(
            planner.set_plan(&[Pose::new(0.2, 0.0, 0.0), Pose::new(2.0, 0.0, 1e-6)]).unwrap(),
            PlanOutcome::NewGoal
        );
        assert_eq!(num_resets.load(Ordering::SeqCst), 2);
        assert!((ref_x(&mut planner) - 0.2).abs() < 1e-9);
        assert_eq!(planner.goal(), Some(Pose::new(2.0, 0.0, 1e-6)));
        assert!(!guard.is_owed());

        // Heading within the epsilon is the same goal
        guard.request_replanning();
        assert_eq!(
            planner.set_plan(&[Pose::new(0.2, 0.0, 0.0), Pose::new(2.0, 0.0, 1e-6 + 1e-9)]).unwrap(),
            PlanOutcome::TrajectoryUpdated
        );
        assert_eq!(num_resets.load(Ordering::SeqCst), 2);
        assert!((ref_x(&mut planner) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_params_handle_applies_next_tick() {
        let (mut planner, _, _) = planner(&[]);
        let handle = planner.params_handle();

        set_pose(&planner, Pose::new(0.0, 0.0, 0.0), 0.0);
        planner.set_plan(&[Pose::new(0.0, 0.0, 0.0), Pose::new(1.0, 0.0, 0.0)]).unwrap();

        let (cmd, _) = planner.compute_velocity_commands().unwrap();
        assert!((cmd.linear_ms[0] - 0.5).abs() < 1e-9);

        // Observer list changes are dropped, the rest takes effect
        let mut params = LocalPlannerParams::default();
        params.max_safe_lin_velocity_ms = 0.1;
        params.safety_observers = vec![ArmSkinObserver::TAG.to_string()];
        handle.apply(params).unwrap();

        assert!(handle.load().safety_observers.is_empty());

        let (cmd, report) = planner.compute_velocity_commands().unwrap();
        assert!(report.safety_veto.is_none());
        assert!((cmd.linear_ms[0] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_idle_and_no_pose() {
        let (mut planner, sink, _) = planner(&[]);

        assert!(matches!(
            planner.compute_velocity_commands(), 
            Err(LocalPlannerError::NoPose)
        ));

        set_pose(&planner, Pose::new(0.0, 0.0, 0.0), 0.0);
        let (cmd, report) = planner.compute_velocity_commands().unwrap();
        assert!(cmd.is_zero());
        assert!(report.idle);
        assert_eq!(sink.0.lock().len(), 1);
    }

    #[test]
    fn test_closed_loop_reaches_goal() {
        let (mut planner, _, _) = planner(&[]);
        let mut sim = SimRobot::new(Pose::new(0.0, 0.0, 0.0), 0.0);
        let updater = planner.pose_updater();

        let (odom, twist) = sim.odometry("map");
        updater.update_pose(&odom, &twist).unwrap();
        planner
            .set_plan(&[Pose::new(0.0, 0.0, 0.0), Pose::new(1.0, 0.0, 0.0), Pose::new(1.0, 0.5, 0.5)])
            .unwrap();

        let mut reached = false;
        for _ in 0..200 {
            let (cmd, report) = planner.compute_velocity_commands().unwrap();
            assert!(report.lin_displacement_m < 0.1);

            sim.step(&cmd, 0.1);
            let (odom, twist) = sim.odometry("map");
            updater.update_pose(&odom, &twist).unwrap();

            if planner.is_goal_reached() {
                reached = true;
                break
            }
        }

        assert!(reached);
        assert!(sim.pose().linear_distance(&Pose::new(1.0, 0.5, 0.5)) <= 0.05);
        assert_eq!(planner.mode(), LocalPlannerMode::Idle);
    }

    #[test]
    fn test_concurrent_pose_updates() {
        let (mut planner, _, _) = planner(&[]);
        set_pose(&planner, Pose::new(0.0, 0.0, 0.0), 0.0);
        planner.set_plan(&[Pose::new(0.0, 0.0, 0.0), Pose::new(1.0, 0.0, 0.0)]).unwrap();

        // Robot held at the start of the trajectory by the localisation thread
        let updater = planner.pose_updater();
        let writer = thread::spawn(move || {
            for _ in 0..1000 {
                updater
                    .update_pose(
                        &StampedPose::new("map", 0.0, Pose::new(0.0, 0.0, 0.0)), 
                        &Twist::zero()
                    )
                    .unwrap();
            }
        });

        for _ in 0..1000 {
            let (cmd, _) = planner.compute_velocity_commands().unwrap();
            assert!(cmd.linear_ms.norm() <= 0.5 + 1e-12);
        }

        writer.join().unwrap();
    }
}
