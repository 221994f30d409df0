//! Bastion Fleet Monitoring
//!
//! Two observers of fleet health:
//!
//! - [`PerformanceMonitor`] samples every node once per cycle, degrading
//!   active nodes as a side effect, and judges the fleet as a whole
//!   against the instability and degraded thresholds.
//! - [`AnomalyDetector`] keeps a longer per-node history and refits an
//!   outlier model over it on every call.
//!
//! # Example
//!
//! ```
//! use bastion_metrics::NullSink;
//! use bastion_monitor::{PerformanceMonitor, DEFAULT_MONITOR_WINDOW};
//! use bastion_node::{Fleet, TrendThresholds};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut fleet = Fleet::initialize(4);
//! let thresholds = TrendThresholds::default();
//! let mut monitor = PerformanceMonitor::new(4, DEFAULT_MONITOR_WINDOW, thresholds);
//! let mut rng = StdRng::seed_from_u64(7);
//!
//! let samples = monitor.collect(&mut fleet, &mut rng);
//! let analysis = monitor.analyze(&samples, 0, &mut NullSink);
//! assert!(!analysis.degraded);
//! ```

mod monitor;
pub mod anomaly;

pub use anomaly::{
    flagged_nodes, Anomaly, AnomalyDetector, DensityStrategy, DetectionStrategy, DetectorConfig,
    DetectorConfigError, IsolationStrategy, OutlierModel,
};
pub use monitor::{FleetAnalysis, PerformanceMonitor, Sample, DEFAULT_MONITOR_WINDOW};
