//! Bastion Fleet Reporting
//!
//! Everything the fleet core tells the outside world goes through here.
//!
//! # Events
//!
//! - `NodeDegraded`, `NodeFailed`, `NodeRepaired` track node lifecycle
//! - `AnomalyDetected` flags outlier samples in a node's history
//! - `InstabilityWarning` flags fleet-wide spread
//! - `UnrecoverableNode` marks a node that exhausted its repair budget
//!
//! Every fault application and every repair decision produces exactly one
//! event. Periodic [`FleetSnapshot`]s carry aggregate performance.
//!
//! # Sinks
//!
//! The transport is a collaborator's concern. [`TracingSink`] writes log
//! records, [`EventLog`] keeps an in-memory timeline, [`EventCounters`]
//! tallies kinds, and [`Fanout`] combines them.

mod events;
mod sink;

pub use events::{FailureCause, FleetEvent, FleetSnapshot, RepairStrategy};
pub use sink::{EventCounters, EventCounts, EventLog, EventSink, Fanout, NullSink, TracingSink};
