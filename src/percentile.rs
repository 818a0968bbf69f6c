//! Percentile Engine
//!
//! Exact nearest-rank percentiles over a materialized pool.
//!
//! For `total` values and percentile `p`, the rank is `p * total / 100`,
//! rounded up when it is not an integer, and the answer is the value at that
//! 1-indexed rank of the ascending sort. `p = 100` always selects the
//! maximum; a tiny `p` selects the minimum (rank 1, never 0).

use crate::error::{PoolError, Result};

/// Answer to a percentile query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantile {
    /// Value at the selected rank
    pub quantile: i64,

    /// Number of values in the pool
    pub total: u64,
}

/// Compute the nearest-rank percentile of `data`
///
/// Takes the snapshot by value and sorts it in place.
pub fn percentile(p: f64, mut data: Vec<i64>) -> Result<Quantile> {
    let total = data.len();
    if total == 0 {
        return Err(PoolError::InvalidInput(
            "cannot compute a percentile of an empty pool".to_string(),
        ));
    }

    // Stable sort keeps ties in a reproducible order
    data.sort();

    let rank = nearest_rank(p, total);

    Ok(Quantile {
        quantile: data[rank - 1],
        total: total as u64,
    })
}

/// 1-indexed nearest rank of percentile `p` among `total` sorted values
///
/// Clamped to `[1, total]`; `total` must be non-zero.
pub fn nearest_rank(p: f64, total: usize) -> usize {
    let position = p * total as f64 / 100.0;

    let rank = if position.fract() == 0.0 {
        position
    } else {
        position.ceil()
    };

    // NaN casts to 0 and lands on rank 1
    (rank as usize).clamp(1, total)
}
