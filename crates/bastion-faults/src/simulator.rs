//! The fault injector.

use bastion_metrics::{EventSink, FailureCause, FleetEvent, RepairStrategy};
use bastion_node::{Fleet, NodeError, NodeId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::table::{FaultKind, FaultTable, FaultTableError};

/// Range of the performance drop applied by a degradation fault.
pub const DEGRADATION_RANGE: std::ops::RangeInclusive<f64> = 0.1..=0.5;

/// Default delay, in ticks, before a transient fault recovers.
pub const DEFAULT_RECOVERY_DELAY: u64 = 1;

/// A fault applied to one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub node: NodeId,
    pub kind: FaultKind,
    /// Performance after the fault
    pub performance: f64,
}

/// A deferred re-activation after a transient fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecovery {
    pub node: NodeId,
    /// First tick at which the node may come back
    pub due_tick: u64,
}

/// Injects synthetic faults and owns the queue of pending transient
/// recoveries.
///
/// Recoveries never block: a transient fault schedules its own
/// re-activation and [`FailureSimulator::recover_due`] performs it on a
/// later tick.
#[derive(Debug, Clone)]
pub struct FailureSimulator {
    table: FaultTable,
    recovery_delay: u64,
    pending: Vec<PendingRecovery>,
}

impl FailureSimulator {
    /// Create a simulator, rejecting an invalid table.
    pub fn new(table: FaultTable, recovery_delay: u64) -> Result<Self, FaultTableError> {
        table.validate()?;
        Ok(Self {
            table,
            recovery_delay: recovery_delay.max(1),
            pending: Vec::new(),
        })
    }

    pub fn table(&self) -> &FaultTable {
        &self.table
    }

    pub fn recovery_delay(&self) -> u64 {
        self.recovery_delay
    }

    /// Transient recoveries not yet performed, in scheduling order.
    pub fn pending(&self) -> &[PendingRecovery] {
        &self.pending
    }

    /// Drop every pending recovery.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Draw once per node, in id order, and apply the selected fault.
    ///
    /// Down nodes are not exempt: a degradation still lowers their stored
    /// performance, and a complete or transient fault counts another
    /// failure.
    pub fn inject<R: Rng + ?Sized>(
        &mut self,
        fleet: &mut Fleet,
        rng: &mut R,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Vec<Fault> {
        let draws: Vec<(NodeId, f64)> = fleet.ids().map(|id| (id, rng.gen::<f64>())).collect();

        let mut faults = Vec::new();
        for (id, draw) in draws {
            let Some(kind) = self.table.select(draw) else {
                continue;
            };
            match self.apply(fleet, id, kind, rng, tick, sink) {
                Ok(fault) => faults.push(fault),
                Err(e) => warn!("Fault injection skipped: {}", e),
            }
        }
        faults
    }

    /// Apply a specific fault to a node, whatever its state.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        fleet: &mut Fleet,
        id: NodeId,
        kind: FaultKind,
        rng: &mut R,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Result<Fault, NodeError> {
        let node = fleet.get_mut(id)?;

        match kind {
            FaultKind::Complete => {
                let failure_count = node.fail();
                error!("{} has completely failed", id);
                sink.emit(FleetEvent::NodeFailed {
                    node: id,
                    failure_count,
                    cause: FailureCause::Fault,
                    tick,
                });
            }
            FaultKind::Degradation => {
                let amount = rng.gen_range(DEGRADATION_RANGE);
                let performance = node.impair(amount);
                warn!(
                    "{} performance degraded by {:.2}, now {:.2}",
                    id, amount, performance
                );
                sink.emit(FleetEvent::NodeDegraded {
                    node: id,
                    performance,
                    tick,
                });
            }
            FaultKind::Transient => {
                let failure_count = node.fail();
                let due_tick = tick + self.recovery_delay;
                info!(
                    "{} has experienced a transient failure, recovery due at tick {}",
                    id, due_tick
                );
                sink.emit(FleetEvent::NodeFailed {
                    node: id,
                    failure_count,
                    cause: FailureCause::Transient,
                    tick,
                });
                self.pending.push(PendingRecovery { node: id, due_tick });
            }
        }

        Ok(Fault {
            node: id,
            kind,
            performance: node.performance(),
        })
    }

    /// Perform every pending recovery due at or before `tick`.
    ///
    /// A node that is already active again (repaired in the meantime) is
    /// skipped without an event. Returns the nodes brought back.
    pub fn recover_due(
        &mut self,
        fleet: &mut Fleet,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Vec<NodeId> {
        let (due, later): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due_tick <= tick);
        self.pending = later;

        let mut recovered = Vec::new();
        for pending in due {
            let node = match fleet.get_mut(pending.node) {
                Ok(node) => node,
                Err(e) => {
                    warn!("Dropping pending recovery: {}", e);
                    continue;
                }
            };
            if node.is_active() {
                debug!("{} already active, transient recovery not needed", pending.node);
                continue;
            }
            node.repair();
            info!("{} has recovered from transient failure", pending.node);
            sink.emit(FleetEvent::NodeRepaired {
                node: pending.node,
                strategy: RepairStrategy::TransientRecovery,
                tick,
            });
            recovered.push(pending.node);
        }
        recovered
    }

    /// Repair every inactive node directly, bypassing the attempt cap.
    pub fn recover_all(
        &mut self,
        fleet: &mut Fleet,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Vec<NodeId> {
        let inactive = fleet.inactive_ids();
        for &id in &inactive {
            if let Ok(node) = fleet.get_mut(id) {
                node.repair();
                info!("{} has been repaired and is now active", id);
                sink.emit(FleetEvent::NodeRepaired {
                    node: id,
                    strategy: RepairStrategy::Harness,
                    tick,
                });
            }
        }
        self.pending.retain(|p| !inactive.contains(&p.node));
        inactive
    }
}
