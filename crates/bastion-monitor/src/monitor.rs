//! Fleet-wide performance sampling and coarse analysis.

use bastion_metrics::{EventSink, FleetEvent, FleetSnapshot};
use bastion_node::{stats, Fleet, History, NodeId, Trend, TrendThresholds, INACTIVE_SENTINEL};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Default length of the monitor's per-node window.
pub const DEFAULT_MONITOR_WINDOW: usize = 10;

/// One node's performance in one collection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub node: NodeId,
    pub performance: f64,
}

impl Sample {
    pub const fn new(node: NodeId, performance: f64) -> Self {
        Self { node, performance }
    }
}

/// Result of analyzing one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetAnalysis {
    pub mean: f64,
    pub std_dev: f64,
    /// Spread exceeded the instability threshold
    pub unstable: bool,
    /// Mean fell below the degraded threshold
    pub degraded: bool,
    /// Nodes below the degraded threshold, forwarded for repair when the
    /// fleet as a whole is degraded
    pub repair_candidates: Vec<NodeId>,
}

/// Samples every node each cycle and keeps its own bounded window per node.
///
/// The window is independent of each node's own history so the two can
/// differ in length.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    window: usize,
    thresholds: TrendThresholds,
    history: Vec<History>,
}

impl PerformanceMonitor {
    /// Create a monitor for `fleet_size` nodes with a per-node window.
    pub fn new(fleet_size: usize, window: usize, thresholds: TrendThresholds) -> Self {
        Self {
            window,
            thresholds,
            history: (0..fleet_size).map(|_| History::with_capacity(window)).collect(),
        }
    }

    pub fn thresholds(&self) -> TrendThresholds {
        self.thresholds
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Drop retained windows and resize for a fleet of `fleet_size`.
    pub fn reset(&mut self, fleet_size: usize) {
        self.history = (0..fleet_size)
            .map(|_| History::with_capacity(self.window))
            .collect();
    }

    /// Sample every node in id order.
    ///
    /// Active nodes degrade by one random step; inactive nodes contribute
    /// the sentinel `0.0` without being touched.
    pub fn collect<R: Rng + ?Sized>(&mut self, fleet: &mut Fleet, rng: &mut R) -> Vec<Sample> {
        if self.history.len() != fleet.len() {
            self.reset(fleet.len());
        }

        let mut samples = Vec::with_capacity(fleet.len());
        for node in fleet.iter_mut() {
            let performance = if node.is_active() {
                node.degrade(rng)
            } else {
                INACTIVE_SENTINEL
            };
            self.history[node.id().index()].push(performance);
            debug!("{} sampled at {:.3}", node.id(), performance);
            samples.push(Sample::new(node.id(), performance));
        }
        samples
    }

    /// Analyze a collection pass.
    ///
    /// Emits an `InstabilityWarning` when the spread is too wide. When the
    /// mean is too low, every node below the degraded threshold becomes a
    /// repair candidate.
    pub fn analyze(
        &self,
        samples: &[Sample],
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> FleetAnalysis {
        let values: Vec<f64> = samples.iter().map(|s| s.performance).collect();
        let Some((mean, std_dev)) = stats::summarize(&values) else {
            return FleetAnalysis::default();
        };

        info!("Performance analysis: mean = {:.2}, std dev = {:.2}", mean, std_dev);

        let unstable = std_dev > self.thresholds.unstable_std_dev;
        if unstable {
            sink.emit(FleetEvent::InstabilityWarning {
                mean_performance: mean,
                std_dev,
                tick,
            });
        }

        let degraded = mean < self.thresholds.degraded_mean;
        let repair_candidates = if degraded {
            let candidates: Vec<NodeId> = samples
                .iter()
                .filter(|s| s.performance < self.thresholds.degraded_mean)
                .map(|s| s.node)
                .collect();
            error!(
                "Fleet performance degraded (mean {:.2}); forwarding {} nodes for repair",
                mean,
                candidates.len()
            );
            candidates
        } else {
            Vec::new()
        };

        FleetAnalysis {
            mean,
            std_dev,
            unstable,
            degraded,
            repair_candidates,
        }
    }

    /// Build a snapshot for the metrics sink from a collection pass.
    pub fn snapshot(
        &self,
        samples: &[Sample],
        analysis: &FleetAnalysis,
        fleet: &Fleet,
        tick: u64,
    ) -> FleetSnapshot {
        FleetSnapshot {
            tick,
            node_count: samples.len(),
            active_count: fleet.active_count(),
            mean_performance: analysis.mean,
            std_dev: analysis.std_dev,
        }
    }

    /// The monitor's window for one node.
    pub fn history(&self, id: NodeId) -> Option<&History> {
        self.history.get(id.index())
    }

    /// Classify the monitor's window for one node.
    pub fn trend(&self, id: NodeId) -> Trend {
        match self.history(id) {
            Some(history) => Trend::classify(&history.to_vec(), self.thresholds),
            None => Trend::InsufficientData,
        }
    }
}
