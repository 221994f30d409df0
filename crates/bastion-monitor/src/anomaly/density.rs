//! Local outlier factor over a single scalar feature.
//!
//! A sample whose local density is much lower than its neighbors' has a
//! factor well above 1. Samples at or below 1 are never flagged.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{flag_top_fraction, OutlierModel, DEFAULT_CONTAMINATION};

/// Guards the reachability density against division by zero.
const DENSITY_EPSILON: f64 = 1e-10;

/// Local outlier factor settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityStrategy {
    /// Neighborhood size `k` (capped at `n - 1`)
    pub neighbors: usize,
    /// Fraction of samples treated as outliers
    pub contamination: f64,
}

impl Default for DensityStrategy {
    fn default() -> Self {
        Self {
            neighbors: 5,
            contamination: DEFAULT_CONTAMINATION,
        }
    }
}

impl DensityStrategy {
    /// Local outlier factor per sample.
    pub fn factors(&self, samples: &[f64]) -> Vec<f64> {
        let n = samples.len();
        let k = self.neighbors.min(n.saturating_sub(1));
        if k == 0 {
            return vec![1.0; n];
        }

        // k nearest neighbors of each sample, nearest first
        let neighborhoods: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                let mut others: Vec<usize> = (0..n).filter(|&j| j != i).collect();
                others.sort_by(|&a, &b| {
                    let da = (samples[a] - samples[i]).abs();
                    let db = (samples[b] - samples[i]).abs();
                    da.total_cmp(&db)
                });
                others.truncate(k);
                others
            })
            .collect();

        let k_distance: Vec<f64> = (0..n)
            .map(|i| {
                let farthest = neighborhoods[i][k - 1];
                (samples[farthest] - samples[i]).abs()
            })
            .collect();

        let density: Vec<f64> = (0..n)
            .map(|i| {
                let reach: f64 = neighborhoods[i]
                    .iter()
                    .map(|&j| k_distance[j].max((samples[i] - samples[j]).abs()))
                    .sum();
                1.0 / (reach / k as f64 + DENSITY_EPSILON)
            })
            .collect();

        (0..n)
            .map(|i| {
                let neighbor_density: f64 = neighborhoods[i].iter().map(|&j| density[j]).sum();
                neighbor_density / k as f64 / density[i]
            })
            .collect()
    }
}

impl OutlierModel for DensityStrategy {
    fn name(&self) -> &'static str {
        "density"
    }

    fn fit_predict(&self, samples: &[f64], _rng: &mut dyn RngCore) -> Vec<bool> {
        let factors = self.factors(samples);
        flag_top_fraction(&factors, self.contamination)
            .into_iter()
            .zip(&factors)
            .map(|(flag, &factor)| flag && factor > 1.0)
            .collect()
    }
}
