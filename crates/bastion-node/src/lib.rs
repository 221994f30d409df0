//! Bastion Fleet Nodes
//!
//! The unit of work in a Bastion fleet: a simulated node whose health
//! degrades over time, fails, and gets repaired in place.
//!
//! # Health Model
//!
//! Each node carries a single performance scalar in `[0.0, 1.0]`:
//! - `1.0` is nominal, set by a full repair
//! - `0.5` is the cautious midpoint left by a soft reset
//! - `0.0` is the floor; degradation clamps here, never below
//!
//! An inactive node keeps its last performance value but reports the
//! sentinel `0.0` to anything that samples it.
//!
//! # Trend Classification
//!
//! A node's bounded history classifies as:
//! - **unstable**: standard deviation above `0.1`
//! - **degraded**: mean below `0.5`
//! - **stable**: neither
//!
//! Fewer than two samples yield `InsufficientData`.
//!
//! # Fleet
//!
//! [`Fleet`] is the explicit context object holding every node. It is owned
//! by the network manager and lent out by reference; nothing else creates
//! or destroys nodes.

mod fleet;
mod history;
mod node;
pub mod stats;
pub mod trend;

pub use fleet::{Fleet, NodeError};
pub use history::History;
pub use node::{Node, NodeId, NodeStatus};
pub use trend::{Trend, TrendThresholds};

/// Performance of a freshly repaired node.
pub const NOMINAL_PERFORMANCE: f64 = 1.0;

/// Performance left behind by a soft reset.
pub const SOFT_RESET_PERFORMANCE: f64 = 0.5;

/// Performance reported for an inactive node.
pub const INACTIVE_SENTINEL: f64 = 0.0;

/// Upper bound of a single monitoring degradation step.
pub const MAX_DEGRADATION_STEP: f64 = 0.1;

/// Default capacity of a node's own history buffer.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

// Soft reset must sit strictly between the floor and nominal
const _: () = assert!(
    INACTIVE_SENTINEL < SOFT_RESET_PERFORMANCE && SOFT_RESET_PERFORMANCE < NOMINAL_PERFORMANCE
);

/// Clamp a performance value into `[0.0, 1.0]`.
///
/// NaN collapses to the floor.
pub fn clamp_performance(value: f64) -> f64 {
    if value.is_nan() {
        return INACTIVE_SENTINEL;
    }
    value.clamp(INACTIVE_SENTINEL, NOMINAL_PERFORMANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp_performance(-0.3), 0.0);
        assert_eq!(clamp_performance(1.7), 1.0);
        assert_eq!(clamp_performance(0.42), 0.42);
        assert_eq!(clamp_performance(f64::NAN), 0.0);
    }
}
