//! Summary statistics over performance samples.
//!
//! Standard deviation is the population form (divide by `n`), matching how
//! fleet-wide and per-node spread are compared against the same threshold.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation. `None` for an empty slice.
pub fn std_dev(samples: &[f64]) -> Option<f64> {
    let mu = mean(samples)?;
    let variance = samples
        .iter()
        .map(|x| (x - mu) * (x - mu))
        .sum::<f64>()
        / samples.len() as f64;
    Some(variance.sqrt())
}

/// Mean and standard deviation together.
pub fn summarize(samples: &[f64]) -> Option<(f64, f64)> {
    Some((mean(samples)?, std_dev(samples)?))
}
