//! The fleet context object: every node, in id order.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::node::{Node, NodeId, NodeStatus};
use crate::DEFAULT_HISTORY_CAPACITY;

/// Errors from addressing nodes in a fleet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The id is outside `0..fleet_size`.
    #[error("unknown node {id}: fleet has {fleet_size} nodes")]
    UnknownNode { id: NodeId, fleet_size: usize },
}

/// Fixed-size ordered collection of nodes.
///
/// Node `i` always sits at index `i`. The set of active ids is derived on
/// demand and never stored separately.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    nodes: Vec<Node>,
}

impl Fleet {
    /// Build `count` nodes with the default history capacity, each
    /// explicitly repaired to active/nominal.
    pub fn initialize(count: usize) -> Self {
        Self::initialize_with_capacity(count, DEFAULT_HISTORY_CAPACITY)
    }

    /// Build `count` nodes keeping `history_capacity` samples each.
    pub fn initialize_with_capacity(count: usize, history_capacity: usize) -> Self {
        let nodes = (0..count)
            .map(|i| {
                let mut node = Node::with_history_capacity(NodeId(i), history_capacity);
                node.repair();
                node
            })
            .collect();
        Self { nodes }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check that an id addresses a node in this fleet.
    pub fn check(&self, id: NodeId) -> Result<(), NodeError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(NodeError::UnknownNode {
                id,
                fleet_size: self.nodes.len(),
            })
        }
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Result<&Node, NodeError> {
        self.check(id)?;
        Ok(&self.nodes[id.index()])
    }

    /// Get a node mutably by id.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, NodeError> {
        self.check(id)?;
        Ok(&mut self.nodes[id.index()])
    }

    /// Iterate nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Iterate nodes mutably in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    /// All ids in order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(Node::id)
    }

    /// Ids of currently active nodes.
    pub fn active_ids(&self) -> BTreeSet<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_active())
            .map(Node::id)
            .collect()
    }

    /// Ids of currently inactive nodes, in order.
    pub fn inactive_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| !n.is_active())
            .map(Node::id)
            .collect()
    }

    /// Number of active nodes.
    pub fn active_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_active()).count()
    }

    /// Snapshot every node in id order.
    pub fn status(&self) -> Vec<NodeStatus> {
        self.nodes.iter().map(Node::status).collect()
    }

    /// The `window` ids following `id` in circular order, starting at
    /// `id + 1 mod n`. Never longer than `n - 1`, so `id` itself is
    /// never a candidate.
    pub fn successors(&self, id: NodeId, window: usize) -> impl Iterator<Item = NodeId> {
        let n = self.nodes.len();
        let start = id.index();
        let window = window.min(n.saturating_sub(1));
        (1..=window).map(move |offset| NodeId((start + offset) % n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_creates_nominal_nodes_in_order() {
        let fleet = Fleet::initialize(5);
        assert_eq!(fleet.len(), 5);
        for (i, node) in fleet.iter().enumerate() {
            assert_eq!(node.id(), NodeId(i));
            assert!(node.is_active());
            assert_eq!(node.performance(), 1.0);
            assert_eq!(node.failure_count(), 0);
        }
        assert_eq!(fleet.active_count(), 5);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut fleet = Fleet::initialize(3);
        assert!(fleet.get(NodeId(2)).is_ok());
        assert_eq!(
            fleet.get_mut(NodeId(3)).unwrap_err(),
            NodeError::UnknownNode {
                id: NodeId(3),
                fleet_size: 3
            }
        );
    }

    #[test]
    fn active_ids_track_node_flags() {
        let mut fleet = Fleet::initialize(4);
        fleet.get_mut(NodeId(1)).unwrap().fail();
        fleet.get_mut(NodeId(3)).unwrap().deactivate();

        let active: Vec<_> = fleet.active_ids().into_iter().collect();
        assert_eq!(active, vec![NodeId(0), NodeId(2)]);
        assert_eq!(fleet.inactive_ids(), vec![NodeId(1), NodeId(3)]);
    }

    #[test]
    fn successors_wrap_around() {
        let fleet = Fleet::initialize(5);
        let ids: Vec<_> = fleet.successors(NodeId(3), 3).collect();
        assert_eq!(ids, vec![NodeId(4), NodeId(0), NodeId(1)]);
    }

    #[test]
    fn successors_never_include_self() {
        let fleet = Fleet::initialize(3);
        let ids: Vec<_> = fleet.successors(NodeId(0), 10).collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(2)]);

        let single = Fleet::initialize(1);
        assert_eq!(single.successors(NodeId(0), 2).count(), 0);
    }

    #[test]
    fn window_equal_to_fleet_size_stops_before_self() {
        let fleet = Fleet::initialize(3);
        let ids: Vec<_> = fleet.successors(NodeId(1), 3).collect();
        assert_eq!(ids, vec![NodeId(2), NodeId(0)]);
    }

    #[test]
    fn zero_window_is_empty() {
        let fleet = Fleet::initialize(5);
        assert_eq!(fleet.successors(NodeId(0), 0).count(), 0);
    }
}
