//! Health trend classification over a window of samples.

use crate::stats;

/// Default spread above which a window counts as unstable.
pub const UNSTABLE_STD_DEV: f64 = 0.1;

/// Default mean below which a window counts as degraded.
pub const DEGRADED_MEAN: f64 = 0.5;

/// Minimum samples needed before a window can be classified.
pub const MIN_TREND_SAMPLES: usize = 2;

/// Thresholds used to classify a window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrendThresholds {
    /// Standard deviation strictly above this is unstable
    pub unstable_std_dev: f64,
    /// Mean strictly below this is degraded
    pub degraded_mean: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            unstable_std_dev: UNSTABLE_STD_DEV,
            degraded_mean: DEGRADED_MEAN,
        }
    }
}

/// Classification of a sample window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Trend {
    /// Fewer than two samples
    InsufficientData,
    /// Spread exceeds the instability threshold
    Unstable,
    /// Mean below the degraded threshold
    Degraded,
    /// Neither unstable nor degraded
    Stable,
}

impl Trend {
    /// Classify a window. Instability takes precedence over degradation.
    pub fn classify(samples: &[f64], thresholds: TrendThresholds) -> Self {
        if samples.len() < MIN_TREND_SAMPLES {
            return Trend::InsufficientData;
        }
        let Some((mean, std_dev)) = stats::summarize(samples) else {
            return Trend::InsufficientData;
        };

        if std_dev > thresholds.unstable_std_dev {
            Trend::Unstable
        } else if mean < thresholds.degraded_mean {
            Trend::Degraded
        } else {
            Trend::Stable
        }
    }

    /// Short lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::InsufficientData => "insufficient-data",
            Trend::Unstable => "unstable",
            Trend::Degraded => "degraded",
            Trend::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
