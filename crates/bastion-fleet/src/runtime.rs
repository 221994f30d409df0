//! Async driver: a cycle ticker and a repair sweep over one shared
//! manager.
//!
//! Both tasks take the manager's write lock for each step, so every
//! mutation of the fleet stays serialized. Shutdown stops issuing ticks,
//! waits for any in-flight step to finish, then shuts the network down.

use std::sync::Arc;
use std::time::Duration;

use bastion_node::NodeStatus;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::manager::NetworkManager;

/// Spawns the periodic tasks.
pub struct FleetRuntime;

impl FleetRuntime {
    /// Spawn the cycle ticker and the repair sweep on the current tokio
    /// runtime, using the intervals from the manager's config.
    pub fn start(manager: NetworkManager) -> FleetHandle {
        let cycle_period = manager.config().monitor_interval();
        let sweep_period = manager.config().repair_sweep_interval();
        info!(
            "Starting fleet runtime (cycle every {:?}, sweep every {:?})",
            cycle_period, sweep_period
        );

        let manager = Arc::new(RwLock::new(manager));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let cycle = tokio::spawn(cycle_loop(
            Arc::clone(&manager),
            cycle_period,
            shutdown_rx.clone(),
        ));
        let sweep = tokio::spawn(sweep_loop(Arc::clone(&manager), sweep_period, shutdown_rx));

        FleetHandle {
            manager,
            shutdown_tx,
            tasks: vec![cycle, sweep],
        }
    }
}

/// Handle to a running fleet.
pub struct FleetHandle {
    manager: Arc<RwLock<NetworkManager>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl FleetHandle {
    /// Get the shared manager.
    pub fn manager(&self) -> Arc<RwLock<NetworkManager>> {
        Arc::clone(&self.manager)
    }

    /// Snapshot every node.
    pub async fn status(&self) -> Vec<NodeStatus> {
        self.manager.read().await.status()
    }

    /// Stop ticking, drain in-flight work, then shut the network down.
    ///
    /// Returns the final node snapshots.
    pub async fn shutdown(self) -> Vec<NodeStatus> {
        info!("Stopping fleet runtime");
        // Receivers may already be gone if a task exited early
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Fleet task failed: {}", e);
            }
        }

        let mut manager = self.manager.write().await;
        manager.shutdown_network();
        manager.status()
    }
}

async fn cycle_loop(
    manager: Arc<RwLock<NetworkManager>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = manager.write().await.run_cycle();
                debug!(
                    "Tick {}: mean {:.2}, {} repairs, {} faults",
                    report.tick,
                    report.analysis.mean,
                    report.repairs.len(),
                    report.faults.len()
                );
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Cycle ticker stopped");
}

async fn sweep_loop(
    manager: Arc<RwLock<NetworkManager>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let repairs = manager.write().await.sweep();
                if !repairs.is_empty() {
                    debug!("Sweep handled {} inactive nodes", repairs.len());
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Repair sweep stopped");
}
