//! Implementations for the follower state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{FollowerError, Params, PidController};
use crate::auto::path::Path;
use crate::records::{DriveDemands, Pose};
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path follower module state
pub struct Follower {
    pub(crate) params: Params,

    /// Executing mode
    mode: FollowerMode,

    /// The path being followed, present once a session has begun
    path: Option<Path>,

    /// Controller producing the steering correction
    pid: PidController,

    /// Steering emitted on the last tick; held once the path completes
    last_steering: f64,
}

/// Status report for follower processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// The mode the follower was in for this tick
    pub mode: FollowerMode,

    /// Signed cross-track error to the active segment, zero when not
    /// following
    pub cross_track_err: f64,

    /// Index of the active path segment
    pub active_seg: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of the follower.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum FollowerMode {
    /// No session active
    Idle,

    /// Tracking the path
    Following,

    /// The path is exhausted; terminal until a new session begins
    Complete,
}

impl Default for FollowerMode {
    fn default() -> Self {
        FollowerMode::Idle
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Follower {
    fn default() -> Self {
        Self::with_params(Params::default())
    }
}

impl State for Follower {
    type InitData = &'static str;
    type InitError = FollowerError;

    type InputData = Pose;
    type OutputData = DriveDemands;
    type StatusReport = StatusReport;
    type ProcError = FollowerError;

    /// Initialise the follower.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params =
            params::load(init_data).map_err(FollowerError::ParamLoadError)?;

        *self = Self::with_params(params);

        Ok(())
    }

    /// Process one follower tick against the current pose.
    fn proc(&mut self, pose: &Pose)
        -> Result<(DriveDemands, StatusReport), FollowerError>
    {
        let mut report = StatusReport::default();

        // Only the following mode produces demands; idle emits nothing and
        // complete holds the stop
        let demands = match self.mode {
            FollowerMode::Idle => DriveDemands::default(),
            FollowerMode::Complete => DriveDemands {
                steering: self.last_steering,
                throttle: 0f64,
            },
            FollowerMode::Following => self.mode_following(pose, &mut report),
        };

        report.mode = self.mode;

        Ok((demands, report))
    }
}

impl Follower {
    /// Build a follower directly from a parameter set.
    pub fn with_params(params: Params) -> Self {
        let pid = PidController::new(
            params.k_p,
            params.k_i,
            params.k_d,
            params.accumulate_integral,
        );

        Self {
            params,
            mode: FollowerMode::Idle,
            path: None,
            pid,
            last_steering: 0f64,
        }
    }

    /// Begin a following session from the configured route.
    ///
    /// Resets the control history and the path cursor; the follower will be
    /// in `Following` mode on the next call to `proc`.
    pub fn begin(&mut self, pose: &Pose) -> Result<(), FollowerError> {
        let points: Vec<Vector2<f64>> = self
            .params
            .route
            .iter()
            .map(|p| Vector2::new(p[0], p[1]))
            .collect();

        let mut path = Path::from_points(&points, self.params.looping)
            .map_err(FollowerError::InvalidRoute)?;

        path.start(pose.position_m);
        self.pid.reset();
        self.last_steering = 0f64;
        self.path = Some(path);
        self.mode = FollowerMode::Following;

        info!(
            "Follower session started: {} nodes, looping: {}",
            points.len(),
            self.params.looping
        );

        Ok(())
    }

    /// The current executing mode.
    pub fn mode(&self) -> FollowerMode {
        self.mode
    }

    /// Mode following path.
    fn mode_following(&mut self, pose: &Pose, report: &mut StatusReport) -> DriveDemands {
        // Begin guarantees the path is present in this mode
        let path = match self.path.as_mut() {
            Some(p) => p,
            None => {
                self.mode = FollowerMode::Complete;
                return DriveDemands::default();
            }
        };

        match path.update(pose.position_m) {
            Some(err) => {
                report.cross_track_err = err;
                report.active_seg = path.active_seg();

                let steering = self.pid.correction(err);
                self.last_steering = steering;

                DriveDemands {
                    steering,
                    throttle: self.params.cruise_throttle,
                }
            }
            None => {
                info!("End of path reached, stopping");
                self.mode = FollowerMode::Complete;

                DriveDemands {
                    steering: self.last_steering,
                    throttle: 0f64,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn pose(x: f64, y: f64) -> Pose {
        Pose {
            position_m: Vector2::new(x, y),
        }
    }

    fn follower(route: Vec<[f64; 2]>, looping: bool) -> Follower {
        Follower::with_params(Params {
            enabled: true,
            k_p: 2.0,
            k_i: 0.0,
            k_d: 0.0,
            accumulate_integral: false,
            cruise_throttle: 0.25,
            route,
            looping,
        })
    }

    fn straight_route() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [10.0, 0.0], [20.0, 0.0]]
    }

    #[test]
    fn test_idle_emits_nothing() {
        let mut f = follower(straight_route(), false);

        let (demands, report) = f.proc(&pose(0.0, 0.0)).unwrap();

        assert_eq!(demands, DriveDemands::default());
        assert_eq!(report.mode, FollowerMode::Idle);
    }

    #[test]
    fn test_following_cruises_and_corrects() {
        let mut f = follower(straight_route(), false);
        f.begin(&pose(0.0, 0.0)).unwrap();

        let (demands, report) = f.proc(&pose(5.0, -1.0)).unwrap();

        assert_eq!(report.mode, FollowerMode::Following);
        assert_eq!(demands.throttle, 0.25);
        assert!((report.cross_track_err.abs() - 1.0).abs() < 1e-12);
        // The correction opposes the error
        assert!(demands.steering * report.cross_track_err < 0.0);
    }

    #[test]
    fn test_completion_stops_throttle() {
        let mut f = follower(straight_route(), false);
        f.begin(&pose(0.0, 0.0)).unwrap();

        f.proc(&pose(5.0, 0.0)).unwrap();
        // Push the cursor to the last valid segment
        f.proc(&pose(15.0, 0.0)).unwrap();

        // The path exhausts on the next tick: throttle must drop to zero
        let (demands, report) = f.proc(&pose(25.0, 0.0)).unwrap();

        assert_eq!(demands.throttle, 0f64);
        assert_eq!(report.mode, FollowerMode::Complete);

        // Complete is terminal: further poses change nothing
        let (demands, report) = f.proc(&pose(30.0, 5.0)).unwrap();
        assert_eq!(demands.throttle, 0f64);
        assert_eq!(report.mode, FollowerMode::Complete);
    }

    #[test]
    fn test_two_node_route_completes_on_first_update() {
        let mut f = follower(vec![[0.0, 0.0], [10.0, 0.0]], false);
        f.begin(&pose(0.0, 0.0)).unwrap();

        let (demands, _) = f.proc(&pose(1.0, 0.0)).unwrap();

        assert_eq!(demands.throttle, 0f64);
        assert_eq!(f.mode(), FollowerMode::Complete);
    }

    #[test]
    fn test_restart_after_completion() {
        let mut f = follower(straight_route(), false);
        f.begin(&pose(0.0, 0.0)).unwrap();

        f.proc(&pose(15.0, 0.0)).unwrap();
        f.proc(&pose(25.0, 0.0)).unwrap();
        assert_eq!(f.mode(), FollowerMode::Complete);

        // A new session leaves the terminal state
        f.begin(&pose(0.0, 0.0)).unwrap();
        let (_, report) = f.proc(&pose(5.0, 0.0)).unwrap();
        assert_eq!(report.mode, FollowerMode::Following);
    }

    #[test]
    fn test_empty_route_rejected() {
        let mut f = follower(vec![], false);
        assert!(f.begin(&pose(0.0, 0.0)).is_err());
    }
}
