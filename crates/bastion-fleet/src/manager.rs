//! The network manager: sole owner of the fleet and the only entry point
//! the other components are driven through.

use std::collections::BTreeSet;

use bastion_faults::{FailureSimulator, Fault, FaultKind};
use bastion_heal::{is_exhausted, Repair, RepairOutcome, SelfHealingMechanism};
use bastion_metrics::{EventSink, FailureCause, FleetEvent, RepairStrategy, TracingSink};
use bastion_monitor::{
    flagged_nodes, Anomaly, AnomalyDetector, FleetAnalysis, PerformanceMonitor, Sample,
};
use bastion_node::{stats, Fleet, NodeId, NodeStatus};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::FleetConfig;
use crate::error::{ConfigError, Result};

/// Everything one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub tick: u64,
    /// Transient faults that came back at the start of the cycle
    pub recoveries: Vec<NodeId>,
    pub samples: Vec<Sample>,
    pub analysis: FleetAnalysis,
    pub anomalies: Vec<Anomaly>,
    /// One entry per distinct node handed to the healer
    pub repairs: Vec<Repair>,
    pub faults: Vec<Fault>,
    /// Nodes brought up as redundancy for complete faults
    pub activations: Vec<NodeId>,
}

/// Aggregate view of the fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub nodes: usize,
    pub active: usize,
    pub inactive: usize,
    /// Nodes whose failure count reached the repair cap
    pub unrecoverable: usize,
    /// Mean of observed performance (inactive nodes count as 0)
    pub mean_performance: f64,
}

/// Owns the fleet and orchestrates monitoring, detection, repair and
/// fault injection, one serialized cycle at a time.
pub struct NetworkManager {
    config: FleetConfig,
    fleet: Fleet,
    monitor: PerformanceMonitor,
    detector: AnomalyDetector,
    healer: SelfHealingMechanism,
    simulator: FailureSimulator,
    rng: StdRng,
    sink: Box<dyn EventSink>,
    tick: u64,
}

impl NetworkManager {
    /// Validate the config and build an initialized fleet.
    pub fn new(config: FleetConfig) -> Result<Self> {
        config.validate()?;

        let thresholds = config.trend_thresholds();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let simulator = FailureSimulator::new(config.faults, config.transient_recovery_ticks)
            .map_err(ConfigError::from)?;

        let mut manager = Self {
            fleet: Fleet::default(),
            monitor: PerformanceMonitor::new(0, config.monitor_window, thresholds),
            detector: AnomalyDetector::new(config.detector),
            healer: SelfHealingMechanism::new(config.max_repair_attempts, thresholds),
            simulator,
            rng,
            sink: Box::new(TracingSink),
            tick: 0,
            config,
        };
        manager.initialize_network(manager.config.num_nodes, manager.config.redundancy_level)?;
        Ok(manager)
    }

    /// Send events to `sink` instead of the log.
    #[must_use]
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn simulator(&self) -> &FailureSimulator {
        &self.simulator
    }

    /// Change the redundancy window used by later failures.
    pub fn set_redundancy_level(&mut self, level: usize) {
        self.config.redundancy_level = level;
    }

    /// The tick the next cycle will run as.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Rebuild the fleet: `n` nodes, all active at nominal performance.
    ///
    /// Monitor windows, detector history and pending recoveries start
    /// over; the tick counter is reset.
    pub fn initialize_network(&mut self, n: usize, redundancy_level: usize) -> Result<()> {
        if n == 0 {
            return Err(ConfigError::NoNodes.into());
        }
        self.config.num_nodes = n;
        self.config.redundancy_level = redundancy_level;

        self.fleet = Fleet::initialize_with_capacity(n, self.config.node_history_capacity);
        self.monitor.reset(n);
        self.detector.reset();
        self.simulator.clear_pending();
        self.tick = 0;

        info!(
            "Initialized {} nodes in the network (redundancy level {})",
            n, redundancy_level
        );
        Ok(())
    }

    /// Fail a node on request and activate redundancy for it.
    ///
    /// Returns the redundant node activated, if any. An unknown id is
    /// reported and changes nothing.
    pub fn simulate_node_failure(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let node = match self.fleet.get_mut(id) {
            Ok(node) => node,
            Err(e) => {
                warn!("Rejected failure request: {}", e);
                return Err(e.into());
            }
        };
        let failure_count = node.fail();
        error!("{} has failed (failure count {})", id, failure_count);
        self.sink.emit(FleetEvent::NodeFailed {
            node: id,
            failure_count,
            cause: FailureCause::Manual,
            tick: self.tick,
        });
        self.handle_failure(id)
    }

    /// Activate at most one inactive node among the `redundancy_level`
    /// successors of `id`, scanning from `id + 1` in circular order.
    pub fn handle_failure(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        self.fleet.check(id)?;
        info!("Handling failure for {}", id);

        let window: Vec<NodeId> = self
            .fleet
            .successors(id, self.config.redundancy_level)
            .collect();
        for candidate in window {
            let node = self.fleet.get_mut(candidate)?;
            if node.is_active() {
                continue;
            }
            node.repair();
            info!("Activated redundant {} to replace {}", candidate, id);
            self.sink.emit(FleetEvent::NodeRepaired {
                node: candidate,
                strategy: RepairStrategy::Redundancy,
                tick: self.tick,
            });
            return Ok(Some(candidate));
        }

        debug!("No inactive node within the redundancy window of {}", id);
        Ok(None)
    }

    /// Administrative shutdown: every node goes inactive without a
    /// failure being counted. Pending transient recoveries are dropped.
    pub fn shutdown_network(&mut self) {
        for node in self.fleet.iter_mut() {
            node.deactivate();
        }
        self.simulator.clear_pending();
        info!("All nodes have been shut down");
    }

    /// Snapshot every node in id order.
    pub fn status(&self) -> Vec<NodeStatus> {
        self.fleet.status()
    }

    /// Ids of active nodes, derived from the fleet.
    pub fn active_ids(&self) -> BTreeSet<NodeId> {
        self.fleet.active_ids()
    }

    /// Aggregate counts and mean observed performance.
    pub fn summary(&self) -> FleetSummary {
        let observed: Vec<f64> = self.fleet.iter().map(|n| n.observed_performance()).collect();
        let active = self.fleet.active_count();
        FleetSummary {
            nodes: self.fleet.len(),
            active,
            inactive: self.fleet.len() - active,
            unrecoverable: self
                .fleet
                .iter()
                .filter(|n| is_exhausted(n.failure_count(), self.healer.max_attempts()))
                .count(),
            mean_performance: stats::mean(&observed).unwrap_or(0.0),
        }
    }

    /// Log one line per node.
    pub fn report(&self) {
        for node in self.fleet.iter() {
            let state = if node.is_active() { "Active" } else { "Failed" };
            info!(
                "{}: {}, performance {:.2}, failures {}",
                node.id(),
                state,
                node.performance(),
                node.failure_count()
            );
        }
    }

    /// Repair one node through the healer.
    pub fn repair_node(&mut self, id: NodeId) -> Result<RepairOutcome> {
        match self.healer.repair_node(&mut self.fleet, id, self.tick, self.sink.as_mut()) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("Rejected repair request: {}", e);
                Err(e.into())
            }
        }
    }

    /// One pass of the repair sweep over every inactive node.
    pub fn sweep(&mut self) -> Vec<Repair> {
        self.healer.sweep(&mut self.fleet, self.tick, self.sink.as_mut())
    }

    /// Draw faults for every node. Complete faults trigger redundancy.
    ///
    /// Returns the faults applied and the redundant nodes activated.
    pub fn inject_faults(&mut self) -> (Vec<Fault>, Vec<NodeId>) {
        let faults = self
            .simulator
            .inject(&mut self.fleet, &mut self.rng, self.tick, self.sink.as_mut());

        let mut activations = Vec::new();
        for fault in faults.iter().filter(|f| f.kind == FaultKind::Complete) {
            if let Ok(Some(activated)) = self.handle_failure(fault.node) {
                activations.push(activated);
            }
        }
        (faults, activations)
    }

    /// Bring every inactive node back directly, bypassing the repair cap.
    pub fn recover_all(&mut self) -> Vec<NodeId> {
        self.simulator
            .recover_all(&mut self.fleet, self.tick, self.sink.as_mut())
    }

    /// Run one cycle:
    ///
    /// 1. due transient recoveries
    /// 2. collect and analyze samples
    /// 3. refit the detector
    /// 4. repair the union of degraded-fleet candidates and flagged nodes
    /// 5. inject faults, if enabled
    /// 6. publish a snapshot and advance the tick
    pub fn run_cycle(&mut self) -> CycleReport {
        let tick = self.tick;
        let sink = self.sink.as_mut();

        let recoveries = self.simulator.recover_due(&mut self.fleet, tick, sink);

        let samples = self.monitor.collect(&mut self.fleet, &mut self.rng);
        let analysis = self.monitor.analyze(&samples, tick, sink);

        self.detector.update(&samples);
        let anomalies = self.detector.detect(&mut self.rng, tick, sink);

        let mut candidates: BTreeSet<NodeId> = analysis.repair_candidates.iter().copied().collect();
        candidates.extend(flagged_nodes(&anomalies));
        let repairs = self.healer.repair_all(&mut self.fleet, candidates, tick, sink);

        let (faults, activations) = if self.config.fault_injection {
            self.inject_faults()
        } else {
            (Vec::new(), Vec::new())
        };

        let snapshot = self.monitor.snapshot(&samples, &analysis, &self.fleet, tick);
        self.sink.snapshot(&snapshot);

        debug!(
            "Cycle {} done: {} anomalies, {} repairs, {} faults",
            tick,
            anomalies.len(),
            repairs.len(),
            faults.len()
        );
        self.tick += 1;

        CycleReport {
            tick,
            recoveries,
            samples,
            analysis,
            anomalies,
            repairs,
            faults,
            activations,
        }
    }
}

impl std::fmt::Debug for NetworkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkManager")
            .field("nodes", &self.fleet.len())
            .field("active", &self.fleet.active_count())
            .field("redundancy_level", &self.config.redundancy_level)
            .field("tick", &self.tick)
            .finish()
    }
}
