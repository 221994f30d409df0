//! Fleet health events.

use bastion_node::NodeId;
use serde::{Deserialize, Serialize};

/// Why a node went inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// Requested through the manager (`simulate_node_failure`)
    Manual,
    /// Complete fault from the injector
    Fault,
    /// Transient fault; a deferred recovery is pending
    Transient,
}

/// How a node was brought back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    /// Full recovery to nominal performance
    Full,
    /// Partial recovery pinned at the soft-reset level
    SoftReset,
    /// Activated as a redundant replacement for a failed neighbor
    Redundancy,
    /// Deferred recovery after a transient fault
    TransientRecovery,
    /// Direct recovery by the fault harness
    Harness,
}

impl std::fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RepairStrategy::Full => "full",
            RepairStrategy::SoftReset => "soft-reset",
            RepairStrategy::Redundancy => "redundancy",
            RepairStrategy::TransientRecovery => "transient-recovery",
            RepairStrategy::Harness => "harness",
        };
        f.write_str(label)
    }
}

/// Events emitted by the fleet core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FleetEvent {
    /// A node's performance dropped from an injected degradation fault
    NodeDegraded {
        node: NodeId,
        performance: f64,
        tick: u64,
    },

    /// A node went inactive
    NodeFailed {
        node: NodeId,
        failure_count: u32,
        cause: FailureCause,
        tick: u64,
    },

    /// A node was brought back to active
    NodeRepaired {
        node: NodeId,
        strategy: RepairStrategy,
        tick: u64,
    },

    /// A sample in a node's history was classified as an outlier
    AnomalyDetected {
        node: NodeId,
        sample_index: usize,
        performance: f64,
        tick: u64,
    },

    /// Fleet-wide spread exceeded the instability threshold
    InstabilityWarning {
        mean_performance: f64,
        std_dev: f64,
        tick: u64,
    },

    /// A node exhausted its repair budget (needs an operator)
    UnrecoverableNode {
        node: NodeId,
        failure_count: u32,
        tick: u64,
    },
}

impl FleetEvent {
    /// Get the tick this event happened in.
    pub fn tick(&self) -> u64 {
        match self {
            FleetEvent::NodeDegraded { tick, .. } => *tick,
            FleetEvent::NodeFailed { tick, .. } => *tick,
            FleetEvent::NodeRepaired { tick, .. } => *tick,
            FleetEvent::AnomalyDetected { tick, .. } => *tick,
            FleetEvent::InstabilityWarning { tick, .. } => *tick,
            FleetEvent::UnrecoverableNode { tick, .. } => *tick,
        }
    }

    /// The node this event concerns, if it concerns a single node.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            FleetEvent::NodeDegraded { node, .. }
            | FleetEvent::NodeFailed { node, .. }
            | FleetEvent::NodeRepaired { node, .. }
            | FleetEvent::AnomalyDetected { node, .. }
            | FleetEvent::UnrecoverableNode { node, .. } => Some(*node),
            FleetEvent::InstabilityWarning { .. } => None,
        }
    }

    /// Event name as used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            FleetEvent::NodeDegraded { .. } => "NodeDegraded",
            FleetEvent::NodeFailed { .. } => "NodeFailed",
            FleetEvent::NodeRepaired { .. } => "NodeRepaired",
            FleetEvent::AnomalyDetected { .. } => "AnomalyDetected",
            FleetEvent::InstabilityWarning { .. } => "InstabilityWarning",
            FleetEvent::UnrecoverableNode { .. } => "UnrecoverableNode",
        }
    }
}

/// Periodic performance snapshot of the whole fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub tick: u64,
    pub node_count: usize,
    pub active_count: usize,
    pub mean_performance: f64,
    pub std_dev: f64,
}
