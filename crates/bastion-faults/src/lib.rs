//! Bastion Fault Injection
//!
//! Drives synthetic failures into a fleet, independently of monitoring,
//! so the repair paths get exercised.
//!
//! # Fault Kinds
//!
//! One uniform draw per node picks at most one fault by cumulative
//! probability, in table order:
//!
//! | Kind | Effect |
//! |------|--------|
//! | complete | `fail()` |
//! | degradation | performance drops by `U[0.1, 0.5]`, clamped at 0; stays active |
//! | transient | `fail()`, then a deferred `repair()` a few ticks later |
//!
//! The remainder of the table means "no fault". Each applied fault emits
//! exactly one event.

mod simulator;
mod table;

pub use simulator::{
    FailureSimulator, Fault, PendingRecovery, DEFAULT_RECOVERY_DELAY, DEGRADATION_RANGE,
};
pub use table::{FaultKind, FaultTable, FaultTableError};
