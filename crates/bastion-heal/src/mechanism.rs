//! The repair state machine.
//!
//! ```text
//! Active(nominal) → Active(unstable | degraded) → Inactive(failed)
//!                                                     │
//!              ┌──────────────────┬──────────────────┤
//!              ▼                  ▼                  ▼
//!      Active(repaired)   Active(soft-reset)   Unrecoverable
//! ```
//!
//! Repair is idempotent under serialized access: an already-active node
//! is re-confirmed at the level its trend calls for, never double-counted.

use std::collections::BTreeSet;

use bastion_metrics::{EventSink, FleetEvent, RepairStrategy};
use bastion_node::{Fleet, NodeError, NodeId, Trend, TrendThresholds};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::budget::{is_exhausted, DEFAULT_MAX_ATTEMPTS};

/// What a repair attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepairOutcome {
    /// Restored to nominal performance
    Full,
    /// Restored at the soft-reset level because the history was unstable
    SoftReset,
    /// Budget exhausted; nothing changed
    Unrecoverable { failure_count: u32 },
}

impl RepairOutcome {
    /// The strategy applied, if the node was brought back.
    pub fn strategy(&self) -> Option<RepairStrategy> {
        match self {
            RepairOutcome::Full => Some(RepairStrategy::Full),
            RepairOutcome::SoftReset => Some(RepairStrategy::SoftReset),
            RepairOutcome::Unrecoverable { .. } => None,
        }
    }

    pub fn is_repaired(&self) -> bool {
        self.strategy().is_some()
    }
}

/// One repair attempt on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repair {
    pub node: NodeId,
    #[serde(flatten)]
    pub outcome: RepairOutcome,
}

/// Repairs nodes with an escalating strategy, bounded by an attempt cap.
///
/// Holds no per-node state; the budget is read from each node's failure
/// count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfHealingMechanism {
    max_attempts: u32,
    thresholds: TrendThresholds,
}

impl Default for SelfHealingMechanism {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, TrendThresholds::default())
    }
}

impl SelfHealingMechanism {
    pub fn new(max_attempts: u32, thresholds: TrendThresholds) -> Self {
        Self {
            max_attempts,
            thresholds,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Attempt to repair one node.
    ///
    /// An exhausted node is reported as `UnrecoverableNode` and left as
    /// is. Otherwise an unstable history gets a soft reset and anything
    /// else a full repair. Every call emits exactly one event.
    pub fn repair_node(
        &self,
        fleet: &mut Fleet,
        id: NodeId,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Result<RepairOutcome, NodeError> {
        let node = fleet.get_mut(id)?;
        let failure_count = node.failure_count();

        if is_exhausted(failure_count, self.max_attempts) {
            error!(
                "{} has failed {} times and cannot be repaired",
                id, failure_count
            );
            sink.emit(FleetEvent::UnrecoverableNode {
                node: id,
                failure_count,
                tick,
            });
            return Ok(RepairOutcome::Unrecoverable { failure_count });
        }

        let outcome = match node.trend_with(self.thresholds) {
            Trend::Unstable => {
                info!("{} is unstable, attempting soft reset", id);
                node.soft_reset();
                RepairOutcome::SoftReset
            }
            _ => {
                info!("{} is being repaired", id);
                node.repair();
                RepairOutcome::Full
            }
        };
        info!(
            "{} repaired ({}): active = {}, performance = {:.2}",
            id,
            outcome.strategy().unwrap_or(RepairStrategy::Full),
            node.is_active(),
            node.performance()
        );

        if let Some(strategy) = outcome.strategy() {
            sink.emit(FleetEvent::NodeRepaired {
                node: id,
                strategy,
                tick,
            });
        }
        Ok(outcome)
    }

    /// Repair each distinct id once, in id order.
    ///
    /// Unknown ids are logged and skipped without touching the fleet.
    pub fn repair_all<I>(
        &self,
        fleet: &mut Fleet,
        ids: I,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Vec<Repair>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let unique: BTreeSet<NodeId> = ids.into_iter().collect();
        let mut repairs = Vec::with_capacity(unique.len());
        for node in unique {
            match self.repair_node(fleet, node, tick, sink) {
                Ok(outcome) => repairs.push(Repair { node, outcome }),
                Err(e) => warn!("Skipping repair: {}", e),
            }
        }
        repairs
    }

    /// One pass of the safety-net loop: attempt a repair on every
    /// currently inactive node.
    pub fn sweep(&self, fleet: &mut Fleet, tick: u64, sink: &mut dyn EventSink) -> Vec<Repair> {
        let inactive = fleet.inactive_ids();
        for id in &inactive {
            warn!("{} is inactive, attempting repair", id);
        }
        self.repair_all(fleet, inactive, tick, sink)
    }
}
