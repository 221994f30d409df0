//! Per-node outlier detection.
//!
//! Each node's retained samples are refit from scratch on every call to
//! [`AnomalyDetector::detect`]; nothing is carried between fits. Two
//! strategies share the [`OutlierModel`] interface:
//!
//! - **Isolation**: random axis splits isolate rare values in fewer steps
//! - **Density**: local outlier factor over the k nearest samples
//!
//! Both flag at most the `contamination` fraction of highest-scoring
//! samples, and never flag anything when every score ties.

mod density;
mod isolation;

use std::collections::{BTreeMap, BTreeSet};

use bastion_metrics::{EventSink, FleetEvent};
use bastion_node::{History, NodeId};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::monitor::Sample;

pub use density::DensityStrategy;
pub use isolation::IsolationStrategy;

/// Samples a node needs before it gets a verdict.
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// Samples retained per node for refitting.
pub const DEFAULT_RETAINED_SAMPLES: usize = 256;

/// Default fraction of samples treated as outliers.
pub const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Largest contamination accepted.
pub const MAX_CONTAMINATION: f64 = 0.5;

/// A fit-and-classify outlier model over one scalar feature.
pub trait OutlierModel {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Fit on `samples` and return one flag per sample, `true` for outliers.
    fn fit_predict(&self, samples: &[f64], rng: &mut dyn RngCore) -> Vec<bool>;
}

/// Which outlier model to fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionStrategy {
    Isolation(IsolationStrategy),
    Density(DensityStrategy),
}

impl Default for DetectionStrategy {
    fn default() -> Self {
        DetectionStrategy::Isolation(IsolationStrategy::default())
    }
}

impl DetectionStrategy {
    /// The configured contamination fraction.
    pub fn contamination(&self) -> f64 {
        match self {
            DetectionStrategy::Isolation(s) => s.contamination,
            DetectionStrategy::Density(s) => s.contamination,
        }
    }

    fn model(&self) -> &dyn OutlierModel {
        match self {
            DetectionStrategy::Isolation(s) => s,
            DetectionStrategy::Density(s) => s,
        }
    }
}

impl OutlierModel for DetectionStrategy {
    fn name(&self) -> &'static str {
        self.model().name()
    }

    fn fit_predict(&self, samples: &[f64], rng: &mut dyn RngCore) -> Vec<bool> {
        self.model().fit_predict(samples, rng)
    }
}

/// Invalid detector settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorConfigError {
    #[error("min_samples must be at least 2, got {0}")]
    MinSamples(usize),

    #[error("retained_samples ({retained}) must be at least min_samples ({min})")]
    Retention { retained: usize, min: usize },

    #[error("contamination must be in (0, {max}], got {value}")]
    Contamination { value: f64, max: f64 },

    #[error("{0} must be at least 1")]
    ZeroParameter(&'static str),
}

/// Detector settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Samples needed before a node gets a verdict
    pub min_samples: usize,
    /// Samples retained per node (oldest evicted)
    pub retained_samples: usize,
    /// Outlier model
    pub strategy: DetectionStrategy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            retained_samples: DEFAULT_RETAINED_SAMPLES,
            strategy: DetectionStrategy::default(),
        }
    }
}

impl DetectorConfig {
    /// Check the settings.
    pub fn validate(&self) -> Result<(), DetectorConfigError> {
        if self.min_samples < 2 {
            return Err(DetectorConfigError::MinSamples(self.min_samples));
        }
        if self.retained_samples < self.min_samples {
            return Err(DetectorConfigError::Retention {
                retained: self.retained_samples,
                min: self.min_samples,
            });
        }
        let contamination = self.strategy.contamination();
        if !(contamination > 0.0 && contamination <= MAX_CONTAMINATION) {
            return Err(DetectorConfigError::Contamination {
                value: contamination,
                max: MAX_CONTAMINATION,
            });
        }
        match self.strategy {
            DetectionStrategy::Isolation(s) if s.trees == 0 => {
                Err(DetectorConfigError::ZeroParameter("trees"))
            }
            DetectionStrategy::Isolation(s) if s.sample_size < 2 => {
                Err(DetectorConfigError::ZeroParameter("sample_size"))
            }
            DetectionStrategy::Density(s) if s.neighbors == 0 => {
                Err(DetectorConfigError::ZeroParameter("neighbors"))
            }
            _ => Ok(()),
        }
    }

    /// Use a different strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: DetectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// An outlier sample in one node's retained history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub node: NodeId,
    /// Position in the retained history, oldest first
    pub sample_index: usize,
    pub performance: f64,
}

/// Keeps per-node sample histories and flags outliers in them.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: DetectorConfig,
    history: BTreeMap<NodeId, History>,
}

impl AnomalyDetector {
    /// Create a detector.
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            history: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Append each sample to its node's retained history.
    pub fn update(&mut self, samples: &[Sample]) {
        let capacity = self.config.retained_samples;
        for sample in samples {
            self.history
                .entry(sample.node)
                .or_insert_with(|| History::with_capacity(capacity))
                .push(sample.performance);
        }
    }

    /// Number of samples retained for a node.
    pub fn sample_count(&self, node: NodeId) -> usize {
        self.history.get(&node).map_or(0, History::len)
    }

    /// Forget every retained sample.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Refit every node with enough samples and report its outliers.
    ///
    /// Nodes below `min_samples` get no verdict this call. Each anomaly is
    /// also emitted to the sink.
    pub fn detect(
        &self,
        rng: &mut dyn RngCore,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Vec<Anomaly> {
        let model = &self.config.strategy;
        let mut anomalies = Vec::new();

        for (&node, history) in &self.history {
            if history.len() < self.config.min_samples {
                continue;
            }
            let samples = history.to_vec();
            let flags = model.fit_predict(&samples, rng);

            for (sample_index, (&performance, outlier)) in samples.iter().zip(flags).enumerate() {
                if !outlier {
                    continue;
                }
                warn!(
                    "Anomaly in {} at index {} ({}): {:.2}",
                    node,
                    sample_index,
                    model.name(),
                    performance
                );
                sink.emit(FleetEvent::AnomalyDetected {
                    node,
                    sample_index,
                    performance,
                    tick,
                });
                anomalies.push(Anomaly {
                    node,
                    sample_index,
                    performance,
                });
            }
        }
        anomalies
    }
}

/// Distinct nodes with at least one anomaly, in id order.
pub fn flagged_nodes(anomalies: &[Anomaly]) -> BTreeSet<NodeId> {
    anomalies.iter().map(|a| a.node).collect()
}

/// Flag scores strictly above the `(1 - contamination)` quantile.
pub(crate) fn flag_top_fraction(scores: &[f64], contamination: f64) -> Vec<bool> {
    if scores.is_empty() {
        return Vec::new();
    }
    let threshold = quantile(scores, 1.0 - contamination);
    scores.iter().map(|&s| s > threshold).collect()
}

/// Linear-interpolated quantile, `q` in `[0, 1]`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_metrics::EventLog;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn feed(detector: &mut AnomalyDetector, node: NodeId, values: &[f64]) {
        for &v in values {
            detector.update(&[Sample::new(node, v)]);
        }
    }

    fn spiked(len: usize, spike_at: usize) -> Vec<f64> {
        (0..len).map(|i| if i == spike_at { 0.1 } else { 0.9 }).collect()
    }

    #[test]
    fn too_few_samples_gives_no_verdict() {
        let mut detector = AnomalyDetector::new(DetectorConfig::default());
        feed(&mut detector, NodeId(0), &spiked(9, 4));

        let mut rng = StdRng::seed_from_u64(1);
        let mut sink = EventLog::new();
        assert!(detector.detect(&mut rng, 0, &mut sink).is_empty());
        assert_eq!(detector.sample_count(NodeId(0)), 9);
    }

    #[test]
    fn isolation_flags_spike() {
        let mut detector = AnomalyDetector::new(DetectorConfig::default());
        feed(&mut detector, NodeId(3), &spiked(20, 7));

        let mut rng = StdRng::seed_from_u64(2);
        let log = EventLog::new();
        let mut sink = log.clone();
        let anomalies = detector.detect(&mut rng, 5, &mut sink);

        assert_eq!(
            anomalies,
            vec![Anomaly {
                node: NodeId(3),
                sample_index: 7,
                performance: 0.1
            }]
        );
        assert_eq!(log.event_count(), 1);
        assert_eq!(log.events()[0].tick(), 5);
    }

    #[test]
    fn density_flags_spike() {
        let config = DetectorConfig::default()
            .with_strategy(DetectionStrategy::Density(DensityStrategy::default()));
        let mut detector = AnomalyDetector::new(config);
        let mut values: Vec<f64> = (0..10).map(|i| 0.9 + i as f64 * 0.01).collect();
        values.push(0.1);
        feed(&mut detector, NodeId(1), &values);

        let mut rng = StdRng::seed_from_u64(3);
        let mut sink = EventLog::new();
        let anomalies = detector.detect(&mut rng, 0, &mut sink);

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].sample_index, 10);
    }

    #[test]
    fn constant_history_has_no_anomalies() {
        for strategy in [
            DetectionStrategy::Isolation(IsolationStrategy::default()),
            DetectionStrategy::Density(DensityStrategy::default()),
        ] {
            let config = DetectorConfig::default().with_strategy(strategy);
            let mut detector = AnomalyDetector::new(config);
            feed(&mut detector, NodeId(0), &[0.8; 30]);

            let mut rng = StdRng::seed_from_u64(4);
            let mut sink = EventLog::new();
            assert!(detector.detect(&mut rng, 0, &mut sink).is_empty(), "{}", strategy.name());
        }
    }

    #[test]
    fn retention_is_bounded() {
        let config = DetectorConfig {
            min_samples: 10,
            retained_samples: 12,
            ..Default::default()
        };
        let mut detector = AnomalyDetector::new(config);
        feed(&mut detector, NodeId(0), &[0.5; 40]);
        assert_eq!(detector.sample_count(NodeId(0)), 12);

        detector.reset();
        assert_eq!(detector.sample_count(NodeId(0)), 0);
    }

    #[test]
    fn flagged_nodes_deduplicate() {
        let anomalies = [
            Anomaly { node: NodeId(2), sample_index: 0, performance: 0.1 },
            Anomaly { node: NodeId(0), sample_index: 3, performance: 0.2 },
            Anomaly { node: NodeId(2), sample_index: 5, performance: 0.1 },
        ];
        let flagged: Vec<_> = flagged_nodes(&anomalies).into_iter().collect();
        assert_eq!(flagged, vec![NodeId(0), NodeId(2)]);
    }

    #[test]
    fn config_validation() {
        assert!(DetectorConfig::default().validate().is_ok());

        let bad = DetectorConfig {
            min_samples: 1,
            ..Default::default()
        };
        assert_eq!(bad.validate(), Err(DetectorConfigError::MinSamples(1)));

        let bad = DetectorConfig {
            retained_samples: 5,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(DetectorConfigError::Retention { .. })));

        let bad = DetectorConfig::default().with_strategy(DetectionStrategy::Density(
            DensityStrategy {
                neighbors: 5,
                contamination: 0.0,
            },
        ));
        assert!(matches!(bad.validate(), Err(DetectorConfigError::Contamination { .. })));

        let bad = DetectorConfig::default().with_strategy(DetectionStrategy::Density(
            DensityStrategy {
                neighbors: 0,
                contamination: 0.1,
            },
        ));
        assert_eq!(bad.validate(), Err(DetectorConfigError::ZeroParameter("neighbors")));
    }

    #[test]
    fn strategy_config_round_trips_through_json() {
        let json = r#"{"kind":"density","neighbors":7,"contamination":0.2}"#;
        let strategy: DetectionStrategy = serde_json::from_str(json).unwrap();
        assert_eq!(
            strategy,
            DetectionStrategy::Density(DensityStrategy {
                neighbors: 7,
                contamination: 0.2
            })
        );
    }

    #[test]
    fn quantile_interpolates() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5), 3.0);
        assert!((quantile(&[0.0, 10.0], 0.9) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn top_fraction_ignores_ties() {
        assert_eq!(flag_top_fraction(&[0.5; 6], 0.1), vec![false; 6]);
        assert!(flag_top_fraction(&[], 0.1).is_empty());

        let flags = flag_top_fraction(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 5.0], 0.1);
        assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
        assert!(flags[9]);
    }

    proptest! {
        #[test]
        fn flags_bounded_by_contamination(
            scores in prop::collection::vec(0.0f64..1.0, 1..200),
            contamination in 0.01f64..0.5,
        ) {
            let flags = flag_top_fraction(&scores, contamination);
            prop_assert_eq!(flags.len(), scores.len());

            let flagged = flags.iter().filter(|&&f| f).count();
            let bound = (contamination * scores.len() as f64).ceil() as usize + 1;
            prop_assert!(flagged <= bound);
        }

        #[test]
        fn anomalies_point_into_retained_history(
            values in prop::collection::vec(0.0f64..=1.0, 10..40),
            seed in any::<u64>(),
        ) {
            let mut detector = AnomalyDetector::new(DetectorConfig::default());
            feed(&mut detector, NodeId(0), &values);

            let mut rng = StdRng::seed_from_u64(seed);
            let anomalies = detector.detect(&mut rng, 0, &mut EventLog::new());
            for anomaly in anomalies {
                prop_assert_eq!(anomaly.node, NodeId(0));
                prop_assert_eq!(values[anomaly.sample_index], anomaly.performance);
            }
        }
    }
}
