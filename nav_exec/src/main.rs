//! Navigation executable entry point.
//!
//! # Architecture
//!
//! Hosts the local planner against a kinematic simulation of the base:
//!
//!     - Initialise the session, logging and parameters
//!     - Spawn the simulation thread, which:
//!         - Applies the latest velocity command
//!         - Pushes odometry through the pose updater
//!         - Feeds a simulated laser scan to the scan observer
//!     - Main loop:
//!         - Local planner control tick
//!         - Replanning when the robot deviates from the trajectory
//!         - Goal reached polling

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{debug, error, info, warn};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, Sender}
};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use nav_lib::{
    geom::{Pose, Twist},
    interfaces::{CommandSink, FixedMapFrame, SinkError, StaticTransform},
    local_planner::{Collaborators, LocalPlanner, LocalPlannerConfig, LocalPlannerError},
    replanning::ReplanningGuard,
    safety::{LaserScan, ScanObserver},
    sim::SimRobot,
    state::PoseUpdater,
    telemetry::JsonTelemetry
};
use util::{
    raise_error,
    logger::{logger_init, LevelFilter},
    session::Session
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one control cycle.
const CYCLE_PERIOD_S: f64 = 0.10;

/// Integration step of the simulation.
const SIM_STEP_S: f64 = 0.02;

/// Cycles after which the goal is abandoned.
const MAX_NUM_CYCLES: u64 = 1000;

/// Range reported by every beam of the simulated scanner.
const SIM_SCAN_RANGE_M: f64 = 4.0;

const SIM_SCAN_NUM_BEAMS: usize = 360;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command sink forwarding commands to the simulation thread.
struct ChannelSink(Sender<Twist>);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    let session = Session::new(
        "nav_exec", 
        "sessions"
    ).wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let config: LocalPlannerConfig = util::params::load("local_planner.toml")
        .wrap_err("Could not load local planner params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    // The simulation's odometry frame sits at an offset in the map
    let odom_in_map = Pose::new(0.5, -0.25, 0.0);

    let (cmd_tx, cmd_rx) = mpsc::channel();

    let telemetry = JsonTelemetry::from_path(session.session_root.join("telemetry.jsonl"))
        .wrap_err("Failed to create the telemetry file")?;

    let mut planner = LocalPlanner::new(&config, Collaborators {
        transforms: Arc::new(StaticTransform::new("map", "odom", odom_in_map)),
        map_frame: Arc::new(FixedMapFrame("map".into())),
        cmd_sink: Box::new(ChannelSink(cmd_tx)),
        telemetry: Some(Box::new(telemetry)),
        replanning: ReplanningGuard::new()
    }).wrap_err("Failed to initialise the local planner")?;

    info!("LocalPlanner init complete");

    // ---- SIMULATION ----

    let stop = Arc::new(AtomicBool::new(false));
    let sim_thread = {
        let updater = planner.pose_updater();
        let scan_observer = planner.safety().scan_observer();
        let stop = stop.clone();

        thread::spawn(move || run_sim(cmd_rx, updater, scan_observer, stop))
    };

    info!("Simulation started");

    // Wait for the first pose so the trajectory starts at the robot's time
    let start_pose = loop {
        if let Some(s) = planner.robot_state() {
            break s.pose
        }
        thread::sleep(Duration::from_secs_f64(SIM_STEP_S));
    };

    // ---- PLANNING ----

    let goal = Pose::new(1.5, 0.75, std::f64::consts::FRAC_PI_2);
    let plan = vec![start_pose, Pose::new(1.5, start_pose.position_m[1], 0.0), goal];

    let outcome = planner.set_plan(&plan)
        .wrap_err("Could not set the plan")?;
    info!("Plan of {} waypoints set: {:?}", plan.len(), outcome);

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut num_cycles = 0u64;
    let mut reached = false;

    while num_cycles < MAX_NUM_CYCLES {

        let cycle_start_instant = Instant::now();

        // ---- CONTROL ----

        match planner.compute_velocity_commands() {
            Ok((cmd, report)) => {
                if let Some(tag) = report.safety_veto {
                    debug!("Command vetoed by {}", tag);
                }
                else {
                    debug!(
                        "Cmd ({:.3}, {:.3}, {:.3}), displacement {:.3} m {:.3} rad",
                        cmd.linear_ms[0], cmd.linear_ms[1], cmd.angular_rads,
                        report.lin_displacement_m, report.ang_displacement_rad
                    );
                }
            },
            Err(LocalPlannerError::TrajectoryDeviation { .. }) => {
                // Straight line replan from wherever the robot is now
                if let Some(s) = planner.robot_state() {
                    match planner.set_plan(&[s.pose, goal]) {
                        Ok(o) => info!("Replanned: {:?}", o),
                        Err(e) => warn!("Could not replan: {}", e)
                    }
                }
            },
            Err(LocalPlannerError::CommandSinkError(e)) => 
                return Err(e).wrap_err("Lost the connection to the simulation"),
            Err(e) => warn!("Error during LocalPlanner processing: {}", e)
        }

        if planner.is_goal_reached() {
            reached = true;
            break
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s", 
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            )
        }

        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    stop.store(true, Ordering::Relaxed);
    if sim_thread.join().is_err() {
        raise_error!("The simulation thread panicked");
    }

    if !reached {
        error!("Goal not reached after {} cycles", MAX_NUM_CYCLES);
        return Err(eyre!("Goal not reached"))
    }

    info!("Goal reached after {} cycles", num_cycles);
    info!("End of execution");

    Ok(())
}

/// Simulation thread body, steps the base in real time until `stop` is set.
fn run_sim(
    cmd_rx: Receiver<Twist>,
    updater: PoseUpdater,
    scan_observer: Option<Arc<ScanObserver>>,
    stop: Arc<AtomicBool>
) {
    let mut sim = SimRobot::new(Pose::default(), 0.0);
    let mut cmd = Twist::zero();

    while !stop.load(Ordering::Relaxed) {
        // Only the most recent command is applied
        while let Ok(c) = cmd_rx.try_recv() {
            cmd = c;
        }

        sim.step(&cmd, SIM_STEP_S);

        let (odom, twist) = sim.odometry("odom");
        if let Err(e) = updater.update_pose(&odom, &twist) {
            warn!("Pose update dropped: {}", e);
        }

        if let Some(ref o) = scan_observer {
            o.update(&open_space_scan(sim.time_s()));
        }

        thread::sleep(Duration::from_secs_f64(SIM_STEP_S));
    }
}

/// A full circle scan with nothing in range of the safety radius.
fn open_space_scan(stamp_s: f64) -> LaserScan {
    let increment_rad = 2.0 * std::f64::consts::PI / SIM_SCAN_NUM_BEAMS as f64;

    LaserScan {
        stamp_s,
        angle_min_rad: -std::f64::consts::PI,
        angle_increment_rad: increment_rad,
        range_min_m: 0.05,
        range_max_m: 10.0,
        ranges_m: vec![SIM_SCAN_RANGE_M; SIM_SCAN_NUM_BEAMS]
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CommandSink for ChannelSink {
    fn send(&mut self, cmd: &Twist) -> Result<(), SinkError> {
        self.0.send(*cmd).map_err(|_| SinkError::Disconnected)
    }
}
