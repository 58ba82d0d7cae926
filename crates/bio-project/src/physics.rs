//! Convenience scalars derived from the run configuration.

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;

/// Characteristic numbers of a run.
///
/// A physical effect that is disabled (or simply absent from the configuration) maps
/// its characteristic number to infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSummary {
    pub run_id: Option<u32>,
    pub n_turbines: usize,
    /// Reynolds number
    pub re: f64,
    /// Rossby number
    pub ro: f64,
    /// Latitude in degrees, when Coriolis forcing is active
    pub latitude: Option<f64>,
    /// Rossby number based on the Coriolis parameter at `latitude`
    pub ro_f: Option<f64>,
    /// Froude number of the stratification
    pub fr: f64,
    pub g_alpha: Option<f64>,
}

impl PhysicsSummary {
    pub fn from_config(config: &RunConfig) -> Self {
        let run_id = config
            .get_i64("io", "runid")
            .and_then(|v| u32::try_from(v).ok());

        let n_turbines = config
            .get_i64("windturbines", "num_turbines")
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(0);

        let re = if config.get_bool("physics", "isinviscid").unwrap_or(false) {
            f64::INFINITY
        } else {
            config.get_f64("physics", "re").unwrap_or(f64::INFINITY)
        };

        let (ro, latitude, ro_f) = if config.get_bool("physics", "usecoriolis").unwrap_or(false) {
            let ro = config.search_f64("ro").unwrap_or(f64::INFINITY);
            let latitude = config.search_f64("latitude");
            let ro_f = latitude.map(|lat| ro / (2.0 * lat.to_radians().cos()));
            (ro, latitude, ro_f)
        } else {
            (f64::INFINITY, None, None)
        };

        let fr = if config.search_bool("isstratified").unwrap_or(false) {
            config.search_f64("fr").unwrap_or(f64::INFINITY)
        } else {
            f64::INFINITY
        };

        Self {
            run_id,
            n_turbines,
            re,
            ro,
            latitude,
            ro_f,
            fr,
            g_alpha: config.search_f64("g_alpha"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disabled_effects_map_to_infinity() {
        let cfg = RunConfig::from_value(json!({
            "io": {"runid": 2},
            "physics": {"isinviscid": true, "usecoriolis": false, "isstratified": false},
        }))
        .unwrap();
        let p = PhysicsSummary::from_config(&cfg);
        assert_eq!(p.run_id, Some(2));
        assert_eq!(p.n_turbines, 0);
        assert!(p.re.is_infinite());
        assert!(p.ro.is_infinite());
        assert!(p.fr.is_infinite());
        assert_eq!(p.ro_f, None);
    }

    #[test]
    fn enabled_effects_read_their_numbers() {
        let cfg = RunConfig::from_value(json!({
            "io": {"runid": 1},
            "physics": {"isinviscid": false, "re": 5000.0, "usecoriolis": true,
                        "isstratified": true},
            "frameangle": {"latitude": 60.0},
            "physics_extra": {"ro": 100.0, "fr": 0.3},
            "windturbines": {"num_turbines": 3},
        }))
        .unwrap();
        let p = PhysicsSummary::from_config(&cfg);
        assert_eq!(p.re, 5000.0);
        assert_eq!(p.ro, 100.0);
        assert_eq!(p.fr, 0.3);
        assert_eq!(p.n_turbines, 3);
        assert!((p.ro_f.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_config_is_not_an_error() {
        let p = PhysicsSummary::from_config(&RunConfig::new());
        assert_eq!(p.run_id, None);
        assert!(p.re.is_infinite());
    }
}
