//! Fault probability table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack allowed when checking that probabilities sum to at most one.
const SUM_TOLERANCE: f64 = 1e-9;

/// The three mutually exclusive fault kinds, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The node fails and stays down
    Complete,
    /// Performance drops sharply; the node stays active
    Degradation,
    /// The node fails and comes back after a short delay
    Transient,
}

impl FaultKind {
    pub const ALL: [FaultKind; 3] = [
        FaultKind::Complete,
        FaultKind::Degradation,
        FaultKind::Transient,
    ];
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::Complete => write!(f, "complete"),
            FaultKind::Degradation => write!(f, "degradation"),
            FaultKind::Transient => write!(f, "transient"),
        }
    }
}

/// Invalid fault probabilities.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FaultTableError {
    #[error("{kind} probability must be in [0, 1], got {value}")]
    Probability { kind: FaultKind, value: f64 },

    #[error("fault probabilities sum to {0}, must be at most 1")]
    Total(f64),
}

/// Per-node, per-injection probability of each fault kind.
///
/// Whatever is left over after the three entries means "no fault".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultTable {
    pub complete: f64,
    pub degradation: f64,
    pub transient: f64,
}

impl Default for FaultTable {
    fn default() -> Self {
        Self {
            complete: 0.1,
            degradation: 0.2,
            transient: 0.1,
        }
    }
}

impl FaultTable {
    /// A table that never selects a fault.
    pub const NONE: FaultTable = FaultTable {
        complete: 0.0,
        degradation: 0.0,
        transient: 0.0,
    };

    pub fn probability(&self, kind: FaultKind) -> f64 {
        match kind {
            FaultKind::Complete => self.complete,
            FaultKind::Degradation => self.degradation,
            FaultKind::Transient => self.transient,
        }
    }

    /// Probability that some fault is selected.
    pub fn total(&self) -> f64 {
        self.complete + self.degradation + self.transient
    }

    /// Check each entry is a probability and the entries sum to at most one.
    pub fn validate(&self) -> Result<(), FaultTableError> {
        for kind in FaultKind::ALL {
            let value = self.probability(kind);
            if !(0.0..=1.0).contains(&value) {
                return Err(FaultTableError::Probability { kind, value });
            }
        }
        let total = self.total();
        if total > 1.0 + SUM_TOLERANCE {
            return Err(FaultTableError::Total(total));
        }
        Ok(())
    }

    /// Pick a fault kind for a uniform draw in `[0, 1)` by cumulative
    /// bucketing in table order.
    pub fn select(&self, draw: f64) -> Option<FaultKind> {
        let mut cumulative = 0.0;
        for kind in FaultKind::ALL {
            cumulative += self.probability(kind);
            if draw < cumulative {
                return Some(kind);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn buckets_follow_table_order() {
        let table = FaultTable::default();
        assert_eq!(table.select(0.0), Some(FaultKind::Complete));
        assert_eq!(table.select(0.099), Some(FaultKind::Complete));
        assert_eq!(table.select(0.1), Some(FaultKind::Degradation));
        assert_eq!(table.select(0.25), Some(FaultKind::Degradation));
        assert_eq!(table.select(0.35), Some(FaultKind::Transient));
        assert_eq!(table.select(0.4), None);
        assert_eq!(table.select(0.99), None);
    }

    #[test]
    fn empty_buckets_are_skipped() {
        let table = FaultTable {
            complete: 0.0,
            degradation: 0.0,
            transient: 0.5,
        };
        assert_eq!(table.select(0.0), Some(FaultKind::Transient));
        assert_eq!(FaultTable::NONE.select(0.0), None);
    }

    #[test]
    fn validation() {
        assert!(FaultTable::default().validate().is_ok());
        assert!(FaultTable::NONE.validate().is_ok());

        let full = FaultTable {
            complete: 0.5,
            degradation: 0.3,
            transient: 0.2,
        };
        assert!(full.validate().is_ok());

        let over = FaultTable {
            complete: 0.6,
            degradation: 0.3,
            transient: 0.2,
        };
        assert!(matches!(over.validate(), Err(FaultTableError::Total(_))));

        let negative = FaultTable {
            degradation: -0.1,
            ..Default::default()
        };
        assert_eq!(
            negative.validate(),
            Err(FaultTableError::Probability {
                kind: FaultKind::Degradation,
                value: -0.1
            })
        );

        let nan = FaultTable {
            transient: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let table: FaultTable = serde_json::from_str(r#"{"complete": 0.3}"#).unwrap();
        assert_eq!(table.complete, 0.3);
        assert_eq!(table.degradation, 0.2);
        assert_eq!(table.transient, 0.1);
    }

    proptest! {
        #[test]
        fn selection_matches_cumulative_bounds(
            complete in 0.0f64..0.4,
            degradation in 0.0f64..0.3,
            transient in 0.0f64..0.3,
            draw in 0.0f64..1.0,
        ) {
            let table = FaultTable { complete, degradation, transient };
            let expected = if draw < complete {
                Some(FaultKind::Complete)
            } else if draw < complete + degradation {
                Some(FaultKind::Degradation)
            } else if draw < complete + degradation + transient {
                Some(FaultKind::Transient)
            } else {
                None
            };
            prop_assert_eq!(table.select(draw), expected);
        }
    }
}
