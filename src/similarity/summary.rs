// Summary statistics over an NSIM map

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Aggregate view of a similarity map
///
/// `proportion_at_or_above` is a percentage of cells whose similarity is at
/// least `threshold`. `masked_mean` averages only the cells below it, which
/// highlights how different the differing regions are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSummary {
    pub threshold: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub proportion_at_or_above: f64,
    pub masked_mean: Option<f64>,
}

impl MapSummary {
    pub fn from_map(map: &ArrayView2<f64>, threshold: f64) -> Self {
        let total = map.len();
        if total == 0 {
            return Self {
                threshold,
                mean: 0.0,
                min: 0.0,
                max: 0.0,
                proportion_at_or_above: 0.0,
                masked_mean: None,
            };
        }

        let mut at_or_above = 0usize;
        let mut below_sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in map.iter() {
            if v >= threshold {
                at_or_above += 1;
            } else {
                below_sum += v;
            }
            min = min.min(v);
            max = max.max(v);
        }

        let below = total - at_or_above;
        Self {
            threshold,
            mean: map.sum() / total as f64,
            min,
            max,
            proportion_at_or_above: at_or_above as f64 * 100.0 / total as f64,
            masked_mean: (below > 0).then(|| below_sum / below as f64),
        }
    }
}
