//! Bastion Self-Healing
//!
//! Repairs nodes that the monitor, the anomaly detector or the periodic
//! sweep hand over, escalating by what the node's own history says.
//!
//! # Strategy
//!
//! - **soft reset** when the history is unstable (std-dev above `0.1`):
//!   active again, but pinned at `0.5`
//! - **full repair** otherwise: active at `1.0`
//! - **unrecoverable** once the failure count reaches the cap (default
//!   3): reported, never reactivated
//!
//! # Triggers
//!
//! All triggers funnel into [`SelfHealingMechanism::repair_node`]. Callers
//! that collect candidates from several sources pass them through
//! [`SelfHealingMechanism::repair_all`], which repairs each node once.

mod budget;
mod mechanism;

pub use budget::{attempts_remaining, is_exhausted, DEFAULT_MAX_ATTEMPTS};
pub use mechanism::{Repair, RepairOutcome, SelfHealingMechanism};
