//! Shared fixtures for the cross-crate scenarios in `tests/`.

use bastion_fleet::{FleetConfig, NetworkManager, Result};
use bastion_metrics::{EventLog, FleetEvent};

/// A seeded manager of `nodes` nodes whose events land in the returned log.
pub fn seeded_manager(
    nodes: usize,
    redundancy: usize,
    seed: u64,
) -> Result<(NetworkManager, EventLog)> {
    let log = EventLog::new();
    let config = FleetConfig::default()
        .with_num_nodes(nodes)
        .with_redundancy_level(redundancy)
        .with_seed(seed);
    let manager = NetworkManager::new(config)?.with_sink(log.clone());
    Ok((manager, log))
}

/// Event kinds in order, for sequence assertions.
pub fn kinds(events: &[FleetEvent]) -> Vec<&'static str> {
    events.iter().map(FleetEvent::kind).collect()
}
