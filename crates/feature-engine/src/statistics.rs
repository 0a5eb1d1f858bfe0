//! Windowed statistics

use std::collections::BTreeMap;

/// Minimum blinks needed before inter-blink entropy is meaningful
pub const MIN_BLINKS_FOR_ENTROPY: usize = 4;

/// Summary statistics for a signal window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticalFeatures {
    /// Number of samples
    pub count: usize,
    /// Mean value
    pub mean: f64,
    /// Population variance
    pub variance: f64,
    /// Standard deviation
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Mean absolute sample-to-sample change
    pub rate_of_change: f64,
}

impl StatisticalFeatures {
    /// Compute statistical features from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

        let rate_of_change = if values.len() >= 2 {
            let total: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
            total / (values.len() - 1) as f64
        } else {
            0.0
        };

        Self {
            count: values.len(),
            mean,
            variance,
            std_dev: variance.sqrt(),
            min,
            max,
            rate_of_change,
        }
    }
}

/// Shannon entropy (bits) of inter-blink intervals, histogrammed into `bin_ms` buckets.
///
/// Returns `None` with fewer than [`MIN_BLINKS_FOR_ENTROPY`] timestamps. A perfectly
/// periodic blinker lands every interval in one bucket and scores 0.
pub fn blink_entropy(timestamps_ms: &[u64], bin_ms: u64) -> Option<f64> {
    if timestamps_ms.len() < MIN_BLINKS_FOR_ENTROPY || bin_ms == 0 {
        return None;
    }

    let mut bins: BTreeMap<u64, usize> = BTreeMap::new();
    for pair in timestamps_ms.windows(2) {
        let interval = pair[1].saturating_sub(pair[0]);
        *bins.entry(interval / bin_ms).or_insert(0) += 1;
    }

    let total = (timestamps_ms.len() - 1) as f64;
    let entropy = bins
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>();

    Some(entropy.max(0.0))
}
