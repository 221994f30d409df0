//! Reporting sinks.
//!
//! The core only knows the [`EventSink`] trait; where events end up (log
//! lines, an in-memory timeline, counters) is the sink's business.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::events::{FleetEvent, FleetSnapshot};

/// Receiver for fleet events and periodic snapshots.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn emit(&mut self, event: FleetEvent);

    /// Deliver a periodic performance snapshot.
    fn snapshot(&mut self, _snapshot: &FleetSnapshot) {}
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: FleetEvent) {
        (**self).emit(event)
    }

    fn snapshot(&mut self, snapshot: &FleetSnapshot) {
        (**self).snapshot(snapshot)
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: FleetEvent) {
        (**self).emit(event)
    }

    fn snapshot(&mut self, snapshot: &FleetSnapshot) {
        (**self).snapshot(snapshot)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: FleetEvent) {}
}

/// Renders events as structured tracing records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: FleetEvent) {
        match event {
            FleetEvent::NodeDegraded { node, performance, tick } => {
                warn!(%node, performance, tick, "node degraded");
            }
            FleetEvent::NodeFailed { node, failure_count, cause, tick } => {
                error!(%node, failure_count, ?cause, tick, "node failed");
            }
            FleetEvent::NodeRepaired { node, strategy, tick } => {
                info!(%node, %strategy, tick, "node repaired");
            }
            FleetEvent::AnomalyDetected { node, sample_index, performance, tick } => {
                warn!(%node, sample_index, performance, tick, "anomaly detected");
            }
            FleetEvent::InstabilityWarning { mean_performance, std_dev, tick } => {
                warn!(mean_performance, std_dev, tick, "fleet performance unstable");
            }
            FleetEvent::UnrecoverableNode { node, failure_count, tick } => {
                error!(%node, failure_count, tick, "node unrecoverable, needs an operator");
            }
        }
    }

    fn snapshot(&mut self, snapshot: &FleetSnapshot) {
        debug!(
            tick = snapshot.tick,
            active = snapshot.active_count,
            nodes = snapshot.node_count,
            mean = snapshot.mean_performance,
            std_dev = snapshot.std_dev,
            "fleet snapshot"
        );
    }
}

/// Records every event and snapshot in memory.
///
/// Clones share the same timeline, so a test can hand one clone to the
/// manager and read the other.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    inner: Arc<Mutex<Timeline>>,
}

#[derive(Debug, Default)]
struct Timeline {
    events: Vec<FleetEvent>,
    snapshots: Vec<FleetSnapshot>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded events.
    pub fn events(&self) -> Vec<FleetEvent> {
        self.inner.lock().events.clone()
    }

    /// Copy of all recorded snapshots.
    pub fn snapshots(&self) -> Vec<FleetSnapshot> {
        self.inner.lock().snapshots.clone()
    }

    /// Number of events recorded.
    pub fn event_count(&self) -> usize {
        self.inner.lock().events.len()
    }

    /// Events matching a predicate.
    pub fn filter(&self, predicate: impl Fn(&FleetEvent) -> bool) -> Vec<FleetEvent> {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<FleetEvent> {
        std::mem::take(&mut self.inner.lock().events)
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: FleetEvent) {
        self.inner.lock().events.push(event);
    }

    fn snapshot(&mut self, snapshot: &FleetSnapshot) {
        self.inner.lock().snapshots.push(snapshot.clone());
    }
}

/// Tally of events by kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    pub degraded: u64,
    pub failed: u64,
    pub repaired: u64,
    pub anomalies: u64,
    pub instability_warnings: u64,
    pub unrecoverable: u64,
    pub snapshots: u64,
}

/// Counts events by kind.
#[derive(Debug, Default, Clone)]
pub struct EventCounters {
    counts: Arc<Mutex<EventCounts>>,
}

impl EventCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tallies.
    pub fn counts(&self) -> EventCounts {
        *self.counts.lock()
    }
}

impl EventSink for EventCounters {
    fn emit(&mut self, event: FleetEvent) {
        let mut counts = self.counts.lock();
        match event {
            FleetEvent::NodeDegraded { .. } => counts.degraded += 1,
            FleetEvent::NodeFailed { .. } => counts.failed += 1,
            FleetEvent::NodeRepaired { .. } => counts.repaired += 1,
            FleetEvent::AnomalyDetected { .. } => counts.anomalies += 1,
            FleetEvent::InstabilityWarning { .. } => counts.instability_warnings += 1,
            FleetEvent::UnrecoverableNode { .. } => counts.unrecoverable += 1,
        }
    }

    fn snapshot(&mut self, _snapshot: &FleetSnapshot) {
        self.counts.lock().snapshots += 1;
    }
}

/// Forwards to several sinks in order.
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Fanout {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    #[must_use]
    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Number of attached sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for Fanout {
    fn emit(&mut self, event: FleetEvent) {
        if let Some((last, rest)) = self.sinks.split_last_mut() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }

    fn snapshot(&mut self, snapshot: &FleetSnapshot) {
        for sink in &mut self.sinks {
            sink.snapshot(snapshot);
        }
    }
}

impl std::fmt::Debug for Fanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fanout").field("sinks", &self.sinks.len()).finish()
    }
}
