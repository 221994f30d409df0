//! Bastion Fleet
//!
//! A simulated self-healing node fleet. [`NetworkManager`] owns every
//! node and drives the other components once per cycle:
//!
//! ```text
//! recover due transients → collect → analyze → detect
//!     → repair (monitor candidates ∪ flagged nodes) → inject faults → snapshot
//! ```
//!
//! Failures also trigger redundancy synchronously: the first inactive node
//! among the next `redundancy_level` ids is brought up.
//!
//! # Example
//!
//! ```
//! use bastion_fleet::{FleetConfig, NetworkManager};
//! use bastion_node::NodeId;
//!
//! let config = FleetConfig::default().with_num_nodes(5).with_seed(1);
//! let mut manager = NetworkManager::new(config)?;
//!
//! manager.simulate_node_failure(NodeId(0))?;
//! let report = manager.run_cycle();
//! assert_eq!(report.samples.len(), 5);
//!
//! manager.shutdown_network();
//! assert!(manager.active_ids().is_empty());
//! # Ok::<(), bastion_fleet::Error>(())
//! ```
//!
//! [`FleetRuntime`] runs the cycle and the repair sweep on tokio intervals
//! for long-lived simulations.

pub mod config;
pub mod error;
mod manager;
mod runtime;

pub use config::FleetConfig;
pub use error::{ConfigError, Error, Result};
pub use manager::{CycleReport, FleetSummary, NetworkManager};
pub use runtime::{FleetHandle, FleetRuntime};
