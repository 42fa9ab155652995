//! Parameters structure for the control arbiter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for control arbitration.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Number of drive ticks an axis stays under autonomy ownership after a
    /// fresh prediction.
    ///
    /// Units: drive ticks
    pub pred_window_ticks: u32,

    /// Full-scale deflection of the raw axis range. Raw samples are divided
    /// by this to reach the normalised [-1, 1] actuator range.
    pub axis_scale: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            pred_window_ticks: 60,
            axis_scale: 32767.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_parse_from_toml() {
        let params: Params = util::params::parse(
            "pred_window_ticks = 30\n\
             axis_scale = 1024.0\n",
        )
        .unwrap();

        assert_eq!(params.pred_window_ticks, 30);
        assert_eq!(params.axis_scale, 1024.0);
    }

    #[test]
    fn test_malformed_params_rejected() {
        assert!(util::params::parse::<Params>("pred_window_ticks = \"many\"").is_err());
    }
}
