//! Fleet configuration.
//!
//! Layered the usual way: defaults, then an optional JSON file, then
//! `BASTION_*` environment variables, then command-line flags in the
//! binary. Whatever the source, [`FleetConfig::validate`] runs before a
//! manager is built.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use bastion_faults::FaultTable;
use bastion_monitor::{DetectorConfig, DEFAULT_MONITOR_WINDOW};
use bastion_node::{TrendThresholds, DEFAULT_HISTORY_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for a fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Number of nodes
    pub num_nodes: usize,

    /// Nodes scanned for redundant activation after a failure
    pub redundancy_level: usize,

    /// Cycle tick period
    pub monitor_interval_secs: f64,

    /// Period of the inactive-node repair sweep
    pub repair_sweep_interval_secs: f64,

    /// Fleet mean below this is degraded; nodes below it are candidates
    #[serde(alias = "anomaly_threshold")]
    pub degraded_threshold: f64,

    /// Standard deviation above this is unstable
    pub instability_threshold: f64,

    /// Failures after which a node is unrecoverable
    pub max_repair_attempts: u32,

    /// Samples kept in each node's own history
    pub node_history_capacity: usize,

    /// Samples kept per node by the performance monitor
    pub monitor_window: usize,

    /// Outlier detection settings
    pub detector: DetectorConfig,

    /// Fault probabilities
    pub faults: FaultTable,

    /// Inject faults at the end of every cycle
    pub fault_injection: bool,

    /// Ticks before a transient fault recovers
    pub transient_recovery_ticks: u64,

    /// Seed for the random source; entropy when unset
    pub seed: Option<u64>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            num_nodes: 10,
            redundancy_level: 2,
            monitor_interval_secs: 5.0,
            repair_sweep_interval_secs: 5.0,
            degraded_threshold: 0.5,
            instability_threshold: 0.1,
            max_repair_attempts: 3,
            node_history_capacity: DEFAULT_HISTORY_CAPACITY,
            monitor_window: DEFAULT_MONITOR_WINDOW,
            detector: DetectorConfig::default(),
            faults: FaultTable::default(),
            fault_injection: false,
            transient_recovery_ticks: 1,
            seed: None,
        }
    }
}

impl FleetConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Defaults overlaid with `BASTION_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay_env()
    }

    /// Overlay `BASTION_*` environment variables onto this config.
    pub fn overlay_env(self) -> Result<Self, ConfigError> {
        self.overlay(|var| std::env::var(var).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(v) = parse_var(&lookup, "BASTION_NUM_NODES")? {
            self.num_nodes = v;
        }
        if let Some(v) = parse_var(&lookup, "BASTION_REDUNDANCY_LEVEL")? {
            self.redundancy_level = v;
        }
        if let Some(v) = parse_var(&lookup, "BASTION_MONITOR_INTERVAL_SECS")? {
            self.monitor_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "BASTION_MAX_REPAIR_ATTEMPTS")? {
            self.max_repair_attempts = v;
        }
        if let Some(v) = parse_var(&lookup, "BASTION_FAULT_INJECTION")? {
            self.fault_injection = v;
        }
        if let Some(v) = parse_var(&lookup, "BASTION_SEED")? {
            self.seed = Some(v);
        }
        Ok(self)
    }

    pub fn with_num_nodes(mut self, num_nodes: usize) -> Self {
        self.num_nodes = num_nodes;
        self
    }

    pub fn with_redundancy_level(mut self, level: usize) -> Self {
        self.redundancy_level = level;
        self
    }

    pub fn with_max_repair_attempts(mut self, attempts: u32) -> Self {
        self.max_repair_attempts = attempts;
        self
    }

    pub fn with_monitor_interval(mut self, secs: f64) -> Self {
        self.monitor_interval_secs = secs;
        self
    }

    pub fn with_repair_sweep_interval(mut self, secs: f64) -> Self {
        self.repair_sweep_interval_secs = secs;
        self
    }

    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_faults(mut self, faults: FaultTable) -> Self {
        self.faults = faults;
        self
    }

    pub fn with_fault_injection(mut self, enabled: bool) -> Self {
        self.fault_injection = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Thresholds used for trend and fleet classification.
    pub fn trend_thresholds(&self) -> TrendThresholds {
        TrendThresholds {
            unstable_std_dev: self.instability_threshold,
            degraded_mean: self.degraded_threshold,
        }
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs_f64(self.monitor_interval_secs)
    }

    pub fn repair_sweep_interval(&self) -> Duration {
        Duration::from_secs_f64(self.repair_sweep_interval_secs)
    }

    /// Check every field against its constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_nodes == 0 {
            return Err(ConfigError::NoNodes);
        }
        check_threshold("degraded_threshold", self.degraded_threshold)?;
        check_threshold("instability_threshold", self.instability_threshold)?;
        check_interval("monitor_interval_secs", self.monitor_interval_secs)?;
        check_interval("repair_sweep_interval_secs", self.repair_sweep_interval_secs)?;
        check_min("max_repair_attempts", u64::from(self.max_repair_attempts), 1)?;
        check_min("node_history_capacity", self.node_history_capacity as u64, 2)?;
        check_min("monitor_window", self.monitor_window as u64, 2)?;
        check_min("transient_recovery_ticks", self.transient_recovery_ticks, 1)?;
        self.faults.validate()?;
        self.detector.validate()?;
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value: raw }),
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Threshold { name, value })
    }
}

fn check_interval(name: &'static str, value: f64) -> Result<(), ConfigError> {
    // Duration::from_secs_f64 panics on non-finite input
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Interval { name, value })
    }
}

fn check_min(name: &'static str, value: u64, min: u64) -> Result<(), ConfigError> {
    if value >= min {
        Ok(())
    } else {
        Err(ConfigError::TooSmall { name, min, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_faults::FaultTableError;
    use bastion_monitor::{DensityStrategy, DetectionStrategy};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = FleetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_nodes, 10);
        assert_eq!(config.redundancy_level, 2);
        assert_eq!(config.max_repair_attempts, 3);
        assert_eq!(config.monitor_interval(), Duration::from_secs(5));
        assert!(!config.fault_injection);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = FleetConfig::from_json(
            r#"{
                "num_nodes": 5,
                "anomaly_threshold": 0.4,
                "detector": { "strategy": { "kind": "density", "neighbors": 3 } },
                "faults": { "transient": 0.0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.num_nodes, 5);
        assert_eq!(config.degraded_threshold, 0.4);
        assert_eq!(config.redundancy_level, 2);
        assert_eq!(config.detector.min_samples, 10);
        assert_eq!(
            config.detector.strategy,
            DetectionStrategy::Density(DensityStrategy {
                neighbors: 3,
                contamination: 0.1
            })
        );
        assert_eq!(config.faults.complete, 0.1);
        assert_eq!(config.faults.transient, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        assert!(matches!(
            FleetConfig::from_json("{ num_nodes: }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = FleetConfig::from_file("/nonexistent/bastion.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_overlay() {
        let config = FleetConfig::default()
            .overlay(lookup(&[
                ("BASTION_NUM_NODES", "7"),
                ("BASTION_REDUNDANCY_LEVEL", " 0 "),
                ("BASTION_FAULT_INJECTION", "true"),
                ("BASTION_SEED", "42"),
            ]))
            .unwrap();

        assert_eq!(config.num_nodes, 7);
        assert_eq!(config.redundancy_level, 0);
        assert!(config.fault_injection);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_repair_attempts, 3);
    }

    #[test]
    fn env_overlay_rejects_garbage() {
        let err = FleetConfig::default()
            .overlay(lookup(&[("BASTION_MAX_REPAIR_ATTEMPTS", "three")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Env {
                var: "BASTION_MAX_REPAIR_ATTEMPTS",
                ..
            }
        ));
    }

    #[test]
    fn validation_rejects_each_bad_field() {
        let cases = [
            FleetConfig::default().with_num_nodes(0),
            FleetConfig::default().with_max_repair_attempts(0),
            FleetConfig::default().with_monitor_interval(0.0),
            FleetConfig::default().with_monitor_interval(f64::INFINITY),
            FleetConfig::default().with_repair_sweep_interval(-1.0),
            FleetConfig {
                degraded_threshold: 0.0,
                ..Default::default()
            },
            FleetConfig {
                instability_threshold: 1.5,
                ..Default::default()
            },
            FleetConfig {
                node_history_capacity: 1,
                ..Default::default()
            },
            FleetConfig {
                transient_recovery_ticks: 0,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }

    #[test]
    fn fault_table_errors_surface() {
        let config = FleetConfig::default().with_faults(FaultTable {
            complete: 0.5,
            degradation: 0.5,
            transient: 0.5,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Faults(FaultTableError::Total(_)))
        ));
    }

    #[test]
    fn thresholds_follow_config() {
        let config = FleetConfig {
            degraded_threshold: 0.3,
            instability_threshold: 0.2,
            ..Default::default()
        };
        let thresholds = config.trend_thresholds();
        assert_eq!(thresholds.degraded_mean, 0.3);
        assert_eq!(thresholds.unstable_std_dev, 0.2);
    }
}
