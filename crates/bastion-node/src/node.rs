//! A single simulated fleet node.

use rand::Rng;

use crate::history::History;
use crate::trend::{Trend, TrendThresholds};
use crate::{
    clamp_performance, DEFAULT_HISTORY_CAPACITY, INACTIVE_SENTINEL, MAX_DEGRADATION_STEP,
    NOMINAL_PERFORMANCE, SOFT_RESET_PERFORMANCE,
};

/// Stable node identifier, `0..n` within a fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub usize);

impl NodeId {
    /// Position of this node in the fleet.
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Immutable snapshot of a node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeStatus {
    pub id: NodeId,
    pub active: bool,
    pub performance: f64,
    pub failure_count: u32,
    pub history: Vec<f64>,
}

/// A simulated node.
///
/// Performance is always within `[0.0, 1.0]`. Nodes are created once per
/// fleet and mutated in place for the rest of the run.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    performance: f64,
    active: bool,
    failure_count: u32,
    history: History,
}

impl Node {
    /// Create a node at nominal health with the default history capacity.
    pub fn new(id: NodeId) -> Self {
        Self::with_history_capacity(id, DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a node at nominal health keeping `capacity` history samples.
    pub fn with_history_capacity(id: NodeId, capacity: usize) -> Self {
        Self {
            id,
            performance: NOMINAL_PERFORMANCE,
            active: true,
            failure_count: 0,
            history: History::with_capacity(capacity),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current performance, regardless of the active flag.
    pub fn performance(&self) -> f64 {
        self.performance
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Performance as seen by monitoring: the sentinel `0.0` when inactive.
    pub fn observed_performance(&self) -> f64 {
        if self.active {
            self.performance
        } else {
            INACTIVE_SENTINEL
        }
    }

    /// Degrade by a random amount drawn uniformly from `[0, 0.1]`.
    ///
    /// Returns the new performance, or the sentinel without touching
    /// history when the node is inactive.
    pub fn degrade<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if !self.active {
            return INACTIVE_SENTINEL;
        }
        let amount = rng.gen_range(0.0..=MAX_DEGRADATION_STEP);
        self.degrade_by(amount)
    }

    /// Degrade by an exact amount and record the result in history.
    pub fn degrade_by(&mut self, amount: f64) -> f64 {
        if !self.active {
            return INACTIVE_SENTINEL;
        }
        self.performance = clamp_performance(self.performance - amount.max(0.0));
        self.history.push(self.performance);
        self.performance
    }

    /// Subtract from performance directly, ignoring the active flag and
    /// leaving history untouched. Used by fault injection.
    pub fn impair(&mut self, amount: f64) -> f64 {
        self.performance = clamp_performance(self.performance - amount.max(0.0));
        self.performance
    }

    /// Mark the node failed. Every call counts, even on an inactive node.
    pub fn fail(&mut self) -> u32 {
        self.active = false;
        self.failure_count = self.failure_count.saturating_add(1);
        self.failure_count
    }

    /// Restore to active at nominal performance. Failure count is kept.
    pub fn repair(&mut self) {
        self.active = true;
        self.performance = NOMINAL_PERFORMANCE;
    }

    /// Restore to active at the cautious soft-reset level.
    pub fn soft_reset(&mut self) {
        self.active = true;
        self.performance = SOFT_RESET_PERFORMANCE;
    }

    /// Take the node out of service without counting a failure.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Classify the node's own history with the default thresholds.
    pub fn trend(&self) -> Trend {
        self.trend_with(TrendThresholds::default())
    }

    /// Classify the node's own history.
    pub fn trend_with(&self, thresholds: TrendThresholds) -> Trend {
        Trend::classify(&self.history.to_vec(), thresholds)
    }

    /// Take a snapshot.
    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            id: self.id,
            active: self.active,
            performance: self.performance,
            failure_count: self.failure_count,
            history: self.history.to_vec(),
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(NodeId::default())
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}, performance {:.2}",
            self.id,
            if self.active { "active" } else { "inactive" },
            self.performance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn new_node_is_nominal() {
        let node = Node::new(NodeId(3));
        assert_eq!(node.id(), NodeId(3));
        assert!(node.is_active());
        assert_eq!(node.performance(), 1.0);
        assert_eq!(node.failure_count(), 0);
        assert!(node.history().is_empty());
    }

    #[test]
    fn degrade_clamps_at_zero() {
        let mut node = Node::new(NodeId(0));
        for _ in 0..12 {
            node.degrade_by(0.09);
        }
        // 12 * 0.09 = 1.08 > 1.0
        assert_eq!(node.performance(), 0.0);
        assert!(node.history().iter().all(|p| p >= 0.0));
    }

    #[test]
    fn degrade_appends_history_up_to_capacity() {
        let mut node = Node::with_history_capacity(NodeId(0), 4);
        for _ in 0..6 {
            node.degrade_by(0.01);
        }
        assert_eq!(node.history().len(), 4);
        assert_eq!(node.history().latest(), Some(node.performance()));
    }

    #[test]
    fn inactive_degrade_is_noop() {
        let mut node = Node::new(NodeId(1));
        node.degrade_by(0.2);
        node.fail();
        let before = node.status();

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(node.degrade(&mut rng), 0.0);
        assert_eq!(node.degrade_by(0.3), 0.0);

        // Stored performance and history unchanged
        assert_eq!(node.status(), before);
        assert_eq!(node.observed_performance(), 0.0);
        assert!((node.performance() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn random_degrade_is_bounded() {
        let mut node = Node::new(NodeId(0));
        let mut rng = StdRng::seed_from_u64(42);
        let mut previous = node.performance();
        for _ in 0..50 {
            let now = node.degrade(&mut rng);
            assert!(previous - now <= MAX_DEGRADATION_STEP + 1e-12);
            assert!(now <= previous);
            previous = now;
        }
    }

    #[test]
    fn fail_counts_every_call() {
        let mut node = Node::new(NodeId(0));
        assert_eq!(node.fail(), 1);
        assert!(!node.is_active());
        // Already inactive: still counted
        assert_eq!(node.fail(), 2);
    }

    #[test]
    fn repair_and_soft_reset_keep_failure_count() {
        let mut node = Node::new(NodeId(0));
        node.fail();
        node.repair();
        assert!(node.is_active());
        assert_eq!(node.performance(), 1.0);
        assert_eq!(node.failure_count(), 1);

        node.fail();
        node.soft_reset();
        assert!(node.is_active());
        assert_eq!(node.performance(), 0.5);
        assert_eq!(node.failure_count(), 2);
    }

    #[test]
    fn impair_ignores_active_flag_and_history() {
        let mut node = Node::new(NodeId(0));
        node.fail();
        node.impair(0.4);
        assert!(!node.is_active());
        assert!((node.performance() - 0.6).abs() < 1e-9);
        assert!(node.history().is_empty());

        node.impair(5.0);
        assert_eq!(node.performance(), 0.0);
    }

    #[test]
    fn deactivate_does_not_count() {
        let mut node = Node::new(NodeId(0));
        node.deactivate();
        assert!(!node.is_active());
        assert_eq!(node.failure_count(), 0);
    }

    #[test]
    fn status_is_idempotent() {
        let mut node = Node::new(NodeId(2));
        node.degrade_by(0.05);
        assert_eq!(node.status(), node.status());
    }

    #[test]
    fn trend_uses_own_history() {
        let mut node = Node::new(NodeId(0));
        assert_eq!(node.trend(), Trend::InsufficientData);
        node.degrade_by(0.0);
        node.degrade_by(0.0);
        assert_eq!(node.trend(), Trend::Stable);
    }

    proptest! {
        #[test]
        fn performance_stays_in_unit_interval(
            ops in proptest::collection::vec((0u8..6, -2.0f64..2.0), 0..64)
        ) {
            let mut node = Node::new(NodeId(0));
            for (op, amount) in ops {
                match op {
                    0 => { node.degrade_by(amount); }
                    1 => { node.impair(amount); }
                    2 => { node.fail(); }
                    3 => node.repair(),
                    4 => node.soft_reset(),
                    _ => node.deactivate(),
                }
                prop_assert!((0.0..=1.0).contains(&node.performance()));
            }
        }

        #[test]
        fn fail_is_strictly_monotonic(times in 1usize..20) {
            let mut node = Node::new(NodeId(0));
            for _ in 0..times {
                let before = node.failure_count();
                node.fail();
                prop_assert!(node.failure_count() > before);
            }
        }

        #[test]
        fn repairs_have_fixed_postconditions(degrade in 0.0f64..1.0, failed in any::<bool>()) {
            let mut node = Node::new(NodeId(0));
            node.degrade_by(degrade);
            if failed {
                node.fail();
            }
            node.repair();
            prop_assert!(node.is_active());
            prop_assert_eq!(node.performance(), 1.0);

            node.soft_reset();
            prop_assert!(node.is_active());
            prop_assert_eq!(node.performance(), 0.5);
        }
    }
}
