//! Isolation forest over a single scalar feature.
//!
//! Each tree recursively splits a random subsample at a uniformly drawn
//! point between its min and max. Rare values end up isolated near the
//! root, so a short average path length means "outlier":
//!
//! ```text
//! score(x) = 2 ^ ( -E[h(x)] / c(ψ) )
//! ```
//!
//! where `c(ψ)` is the expected path length of an unsuccessful BST search
//! over `ψ` items.

use rand::seq::index;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::{flag_top_fraction, OutlierModel, DEFAULT_CONTAMINATION};

/// Euler–Mascheroni constant.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation forest settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationStrategy {
    /// Number of trees in the forest
    pub trees: usize,
    /// Subsample drawn per tree (capped at the history length)
    pub sample_size: usize,
    /// Fraction of samples treated as outliers
    pub contamination: f64,
}

impl Default for IsolationStrategy {
    fn default() -> Self {
        Self {
            trees: 100,
            sample_size: 256,
            contamination: DEFAULT_CONTAMINATION,
        }
    }
}

#[derive(Debug)]
enum Tree {
    Leaf { size: usize },
    Split { at: f64, left: Box<Tree>, right: Box<Tree> },
}

impl Tree {
    fn grow(values: Vec<f64>, depth: usize, limit: usize, rng: &mut dyn RngCore) -> Self {
        if depth >= limit || values.len() <= 1 {
            return Tree::Leaf { size: values.len() };
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min >= max {
            return Tree::Leaf { size: values.len() };
        }

        let at = rng.gen_range(min..max);
        let (left, right): (Vec<f64>, Vec<f64>) = values.into_iter().partition(|&v| v < at);
        Tree::Split {
            at,
            left: Box::new(Tree::grow(left, depth + 1, limit, rng)),
            right: Box::new(Tree::grow(right, depth + 1, limit, rng)),
        }
    }

    fn path_length(&self, x: f64) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Tree::Leaf { size } => return depth + average_path_length(*size),
                Tree::Split { at, left, right } => {
                    node = if x < *at { &**left } else { &**right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// `c(n)`: average path length of an unsuccessful search in a BST of `n`.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

impl IsolationStrategy {
    /// Anomaly score per sample, in `(0, 1]`; higher is more isolated.
    pub fn scores(&self, samples: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        let n = samples.len();
        if n < 2 || self.trees == 0 {
            return vec![0.0; n];
        }

        let psi = self.sample_size.clamp(2, n);
        let limit = (psi as f64).log2().ceil() as usize;

        let forest: Vec<Tree> = (0..self.trees)
            .map(|_| {
                let subsample = index::sample(rng, n, psi)
                    .into_iter()
                    .map(|i| samples[i])
                    .collect();
                Tree::grow(subsample, 0, limit, rng)
            })
            .collect();

        let norm = average_path_length(psi);
        samples
            .iter()
            .map(|&x| {
                let mean_path =
                    forest.iter().map(|t| t.path_length(x)).sum::<f64>() / forest.len() as f64;
                2f64.powf(-mean_path / norm)
            })
            .collect()
    }
}

impl OutlierModel for IsolationStrategy {
    fn name(&self) -> &'static str {
        "isolation"
    }

    fn fit_predict(&self, samples: &[f64], rng: &mut dyn RngCore) -> Vec<bool> {
        let scores = self.scores(samples, rng);
        flag_top_fraction(&scores, self.contamination)
    }
}
