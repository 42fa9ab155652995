//! Parameters structure for the path follower

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for path following.
///
/// The PID gains are tuned at the drive loop's configured tick rate; the
/// derivative term is a raw sample-to-sample difference, so changing the
/// loop rate changes the effective derivative gain.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// If true the drive loop runs the follower as its autonomy source
    pub enabled: bool,

    /// Proportional gain on the cross-track error
    pub k_p: f64,

    /// Integral gain on the accumulated cross-track error
    pub k_i: f64,

    /// Derivative gain on the per-tick error difference
    pub k_d: f64,

    /// If false the integral term is never accumulated, avoiding windup on
    /// long off-path excursions
    pub accumulate_integral: bool,

    /// Throttle held while on the path, in the normalised [-1, 1] range
    pub cruise_throttle: f64,

    /// The route to follow, as (x, y) pairs in the route frame
    pub route: Vec<[f64; 2]>,

    /// If true the route wraps from its last node back to the first
    pub looping: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            enabled: false,
            k_p: 10.0,
            k_i: 0.1,
            k_d: 10.0,
            accumulate_integral: false,
            cruise_throttle: 1.0,
            route: Vec::new(),
            looping: false,
        }
    }
}
