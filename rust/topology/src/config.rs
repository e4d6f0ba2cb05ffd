// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration loaded from environment variables or JSON.

use serde::{Deserialize, Serialize};

use crate::epsilon::{Epsilon, DEFAULT_EPSILON};
use crate::error::{Error, Result};

const DEFAULT_BULK_THRESHOLD: usize = 64;
const DEFAULT_RAY_PROBE_LIMIT: usize = 64;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tolerance for every geometric comparison.
    pub epsilon: f64,
    /// Components with at least this many elements get their index
    /// bulk-loaded instead of filled by repeated insertion.
    pub rtree_bulk_threshold: usize,
    /// Maximum number of disambiguation probes when a containment ray
    /// grazes a triangle edge or vertex.
    pub ray_probe_limit: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let epsilon = lookup("GEOSTORE_EPSILON")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| Epsilon::new(*v).is_ok())
            .unwrap_or(DEFAULT_EPSILON);
        Self {
            epsilon,
            rtree_bulk_threshold: lookup("GEOSTORE_BULK_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BULK_THRESHOLD),
            ray_probe_limit: lookup("GEOSTORE_RAY_PROBE_LIMIT")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_RAY_PROBE_LIMIT),
        }
    }

    /// Parse a JSON document. Missing fields take their defaults; present
    /// but invalid values are an error.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Epsilon::new(self.epsilon).map_err(|_| {
            Error::Config(format!("epsilon must be finite and non-negative, got {}", self.epsilon))
        })?;
        if self.ray_probe_limit == 0 {
            return Err(Error::Config("ray_probe_limit must be positive".into()));
        }
        Ok(())
    }

    /// The configured tolerance as a comparator.
    pub fn tolerance(&self) -> Result<Epsilon> {
        Epsilon::new(self.epsilon)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            rtree_bulk_threshold: DEFAULT_BULK_THRESHOLD,
            ray_probe_limit: DEFAULT_RAY_PROBE_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(Config::from_vars(vars(&[])), Config::default());
    }

    #[test]
    fn reads_variables() {
        let config = Config::from_vars(vars(&[
            ("GEOSTORE_EPSILON", "1e-6"),
            ("GEOSTORE_BULK_THRESHOLD", "10"),
            ("GEOSTORE_RAY_PROBE_LIMIT", "5"),
        ]));
        assert_eq!(config.epsilon, 1e-6);
        assert_eq!(config.rtree_bulk_threshold, 10);
        assert_eq!(config.ray_probe_limit, 5);
    }

    #[test]
    fn invalid_variables_fall_back() {
        let config = Config::from_vars(vars(&[
            ("GEOSTORE_EPSILON", "-1"),
            ("GEOSTORE_BULK_THRESHOLD", "lots"),
            ("GEOSTORE_RAY_PROBE_LIMIT", "0"),
        ]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn json_partial_and_invalid() {
        let config = Config::from_json(r#"{ "epsilon": 1e-4 }"#).unwrap();
        assert_eq!(config.epsilon, 1e-4);
        assert_eq!(config.ray_probe_limit, DEFAULT_RAY_PROBE_LIMIT);

        assert!(matches!(
            Config::from_json(r#"{ "epsilon": -0.5 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(Config::from_json("not json"), Err(Error::Config(_))));
    }
}
