//! `bastion-sim`: run a simulated self-healing fleet.
//!
//! With `--ticks N` runs N cycles synchronously and prints the final
//! status as JSON. Without it, drives the fleet on its configured
//! intervals until Ctrl-C.

use std::path::PathBuf;

use bastion_fleet::{FleetConfig, FleetRuntime, NetworkManager};
use bastion_logging::{LogFormat, DEFAULT_FILTER};
use bastion_metrics::{EventCounters, Fanout, TracingSink};
use clap::Parser;
use tracing::info;

/// Simulated self-healing fleet.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file; defaults apply to missing fields.
    #[arg(short, long, env = "BASTION_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of nodes.
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Redundancy window size.
    #[arg(short, long)]
    redundancy: Option<usize>,

    /// Seed for the random source.
    #[arg(long)]
    seed: Option<u64>,

    /// Inject synthetic faults every cycle.
    #[arg(long)]
    faults: bool,

    /// Cycle period in seconds.
    #[arg(long, value_name = "SECS")]
    interval: Option<f64>,

    /// Run this many cycles synchronously, then print status and exit.
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Log output style (full, pretty, compact).
    #[arg(long, default_value = "full")]
    log_format: LogFormat,
}

impl Cli {
    fn load_config(&self) -> Result<FleetConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => FleetConfig::from_file(path)?,
            None => FleetConfig::default(),
        }
        .overlay_env()?;

        if let Some(nodes) = self.nodes {
            config.num_nodes = nodes;
        }
        if let Some(redundancy) = self.redundancy {
            config.redundancy_level = redundancy;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(interval) = self.interval {
            config.monitor_interval_secs = interval;
        }
        if self.faults {
            config.fault_injection = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    bastion_logging::try_init_with(DEFAULT_FILTER, cli.log_format)?;

    let config = cli.load_config()?;
    info!(
        "Starting Bastion fleet: {} nodes, redundancy {}, fault injection {}",
        config.num_nodes, config.redundancy_level, config.fault_injection
    );

    let counters = EventCounters::new();
    let sink = Fanout::new().with(TracingSink).with(counters.clone());
    let mut manager = NetworkManager::new(config)?.with_sink(sink);

    match cli.ticks {
        Some(ticks) => {
            for _ in 0..ticks {
                manager.run_cycle();
            }
            manager.report();
            let output = serde_json::json!({
                "ticks": ticks,
                "summary": manager.summary(),
                "events": counters.counts(),
                "nodes": manager.status(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        None => {
            let handle = FleetRuntime::start(manager);
            tokio::signal::ctrl_c().await?;
            let status = handle.shutdown().await;
            info!(
                "Fleet stopped: {} nodes, events {:?}",
                status.len(),
                counters.counts()
            );
        }
    }

    Ok(())
}
