//! Main car-side executable entry point.
//!
//! # Architecture
//!
//! The exec is a set of OS threads joined only by latest-value sample
//! channels:
//!
//!     - Producers: joystick, camera, lidar, prediction client
//!     - Consumers: drive loop (arbitration + path following + actuation),
//!       frame logger, telemetry server
//!
//! Each thread runs a rate-limited polling loop conditioned on the
//! process-wide lifecycle flag; SIGINT clears the flag and the threads wind
//! down on their own.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use car_lib::{
    arbiter::ControlArbiter,
    auto::follower::Follower,
    camera,
    channel::{channel, channel_with},
    drive,
    eqpt::sim::{ScriptedInput, SimActuator, SimFrameSource, SimPoseSource, SimSweepSource},
    frame_log, joystick, lidar,
    lifecycle::Lifecycle,
    pred_client::PredClient,
    records::{AxisRecord, ButtonRecord, ImageRecord, LidarRecord},
    telem_server::TelemServer,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{error, info, warn};
use nalgebra::Vector2;
use std::env;
use std::thread;
use std::time::Duration;

// Internal
use comms_if::net::{zmq, NetParams};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time allowed for worker loops to observe the shutdown flag and exit.
const SHUTDOWN_GRACE_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("car_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Dart Car Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // No CLI arguments are expected; everything comes from the params dir
    let args: Vec<String> = env::args().collect();
    if args.len() != 1 {
        return Err(eyre!("Expected no arguments, found {}", args.len() - 1));
    }

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;
    let joystick_params: joystick::Params =
        util::params::load("joystick.toml").wrap_err("Could not load joystick params")?;
    let cam_params: camera::Params =
        util::params::load("cam.toml").wrap_err("Could not load camera params")?;
    let lidar_params: lidar::Params =
        util::params::load("lidar.toml").wrap_err("Could not load lidar params")?;
    let pred_params: car_lib::pred_client::Params =
        util::params::load("pred.toml").wrap_err("Could not load prediction params")?;
    let frame_log_params: frame_log::Params =
        util::params::load("frame_log.toml").wrap_err("Could not load frame log params")?;
    let drive_params: drive::Params =
        util::params::load("drive.toml").wrap_err("Could not load drive params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let mut arbiter = ControlArbiter::default();
    arbiter
        .init("arbiter.toml", &session)
        .wrap_err("Failed to initialise the arbiter")?;
    info!("Arbiter init complete");

    let mut follower = Follower::default();
    follower
        .init("follower.toml", &session)
        .wrap_err("Failed to initialise the follower")?;
    info!("Follower init complete");

    // ---- CREATE CHANNELS ----

    // Small records get deep slack; the large image and sweep payloads use
    // capacity 3 so readers are not lapped by the producer
    let (axis_tx, axis_rx) =
        channel::<AxisRecord>(10).wrap_err("Failed to create the axis channel")?;
    let (button_tx, button_rx) =
        channel::<ButtonRecord>(10).wrap_err("Failed to create the button channel")?;
    let (pred_tx, pred_rx) =
        channel::<AxisRecord>(10).wrap_err("Failed to create the prediction channel")?;

    let frame_len = cam_params.frame_len();
    let (img_tx, img_rx) = channel_with(3, || ImageRecord::with_frame_len(frame_len))
        .wrap_err("Failed to create the image channel")?;
    let (lidar_tx, lidar_rx) = channel_with(3, LidarRecord::with_max_returns)
        .wrap_err("Failed to create the lidar channel")?;

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let mut pred_client = PredClient::new(&zmq_ctx, &net_params, pred_params)
        .wrap_err("Failed to initialise the prediction client")?;
    info!("PredClient initialised");

    let mut telem_server =
        TelemServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise the telemetry server")?;
    info!("TelemServer initialised");

    // ---- LIFECYCLE ----

    let lc = Lifecycle::new();
    {
        let handler_lc = lc.clone();
        ctrlc::set_handler(move || handler_lc.shutdown())
            .wrap_err("Failed to register the termination handler")?;
    }

    // ---- LAUNCH WORKER THREADS ----

    info!("Launching worker threads\n");

    let mut workers: Vec<thread::JoinHandle<()>> = Vec::new();

    // Joystick producer. Device drivers are out-of-tree; the sim device
    // replays nothing and leaves the car to the autonomy streams.
    let joystick_device = joystick_params.device.clone();
    match joystick_device.as_str() {
        "sim" => {
            let worker_lc = lc.clone();
            workers.push(thread::spawn(move || {
                joystick::run(
                    worker_lc,
                    joystick_params,
                    ScriptedInput::new(Vec::new()),
                    axis_tx,
                    button_tx,
                )
            }));
        }
        other => error!("No joystick driver for \"{}\", joystick disabled", other),
    }

    // Camera producer
    let cam_device = cam_params.device.clone();
    match cam_device.as_str() {
        "sim" => {
            let worker_lc = lc.clone();
            workers.push(thread::spawn(move || {
                camera::run(worker_lc, cam_params, SimFrameSource::new(frame_len), img_tx)
            }));
        }
        other => error!("No camera driver for \"{}\", camera disabled", other),
    }

    // Lidar producer
    let lidar_device = lidar_params.device.clone();
    match lidar_device.as_str() {
        "sim" => {
            let worker_lc = lc.clone();
            workers.push(thread::spawn(move || {
                lidar::run(worker_lc, lidar_params, SimSweepSource::new(1500.0), lidar_tx)
            }));
        }
        other => warn!("No lidar driver for \"{}\", lidar disabled", other),
    }

    // Prediction client
    {
        let worker_lc = lc.clone();
        let img_rx = img_rx.clone();
        let button_rx = button_rx.clone();
        workers.push(thread::spawn(move || {
            pred_client.run(worker_lc, img_rx, button_rx, pred_tx)
        }));
    }

    // Frame logger
    {
        let worker_lc = lc.clone();
        let worker_session = session.clone();
        let img_rx = img_rx.clone();
        let axis_rx = axis_rx.clone();
        workers.push(thread::spawn(move || {
            frame_log::run(
                worker_lc,
                frame_log_params,
                worker_session,
                img_rx,
                axis_rx,
                button_rx,
            )
        }));
    }

    // Telemetry server
    {
        let worker_lc = lc.clone();
        workers.push(thread::spawn(move || {
            telem_server.run(worker_lc, img_rx, lidar_rx)
        }));
    }

    // Drive loop
    {
        let worker_lc = lc.clone();
        workers.push(thread::spawn(move || {
            drive::run(
                worker_lc,
                drive_params,
                arbiter,
                follower,
                SimActuator::default(),
                SimPoseSource::new(Vector2::zeros(), 0.05),
                axis_rx,
                pred_rx,
            )
        }));
    }

    // ---- WAIT FOR SHUTDOWN ----

    while lc.running() {
        thread::sleep(Duration::from_millis(100));
    }

    info!("Shutdown requested, waiting for workers");

    // Let worker loops observe the flag before joining
    thread::sleep(Duration::from_millis(SHUTDOWN_GRACE_MS));

    for worker in workers {
        if worker.join().is_err() {
            warn!("A worker thread panicked during shutdown");
        }
    }

    info!("End of execution");

    Ok(())
}
