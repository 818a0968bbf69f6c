//! Tests for the nearest-rank percentile engine
//!
//! These tests verify:
//! - Exact integer ranks and ceiling ranks
//! - Minimum/maximum selection at the ends of the range
//! - Independence from insertion order
//! - Monotonicity in the percentile

use rankpool::percentile::{nearest_rank, percentile, Quantile};
use rankpool::store::truncate_value;
use rankpool::PoolError;

// =============================================================================
// Fixtures
// =============================================================================

#[test]
fn test_million_values_integer_rank() {
    let data: Vec<i64> = (1..=1_000_000).rev().collect();

    let q = percentile(85.5, data).unwrap();

    assert_eq!(
        q,
        Quantile {
            quantile: 855_000,
            total: 1_000_000
        }
    );
}

#[test]
fn test_small_set_with_fractional_input() {
    let raw = [-1.2, 32.0, -52.0, 100.0, 282.0];

    // Stored convention: truncate toward zero (-1.2 -> -1)
    let toward_zero: Vec<i64> = raw.iter().map(|&v| truncate_value(v).unwrap()).collect();
    assert_eq!(toward_zero, vec![-1, 32, -52, 100, 282]);
    let q = percentile(80.0, toward_zero).unwrap();
    assert_eq!(q, Quantile { quantile: 100, total: 5 });

    // A floor convention (-1.2 -> -2) selects the same rank-4 value here
    let floored: Vec<i64> = raw.iter().map(|&v| v.floor() as i64).collect();
    assert_eq!(floored[0], -2);
    let q = percentile(80.0, floored).unwrap();
    assert_eq!(q, Quantile { quantile: 100, total: 5 });
}

// =============================================================================
// Rank Selection Tests
// =============================================================================

#[test]
fn test_fractional_rank_rounds_up() {
    let data: Vec<i64> = (1..=10).collect();

    // 33% of 10 = 3.3 -> rank 4
    assert_eq!(percentile(33.0, data.clone()).unwrap().quantile, 4);
    // 30% of 10 = 3.0 -> rank 3
    assert_eq!(percentile(30.0, data.clone()).unwrap().quantile, 3);
    // 50% of 10 = 5.0 -> rank 5
    assert_eq!(percentile(50.0, data).unwrap().quantile, 5);
}

#[test]
fn test_hundredth_percentile_is_maximum() {
    let data = vec![3, -7, 99, 12, 0];
    assert_eq!(percentile(100.0, data).unwrap().quantile, 99);
}

#[test]
fn test_tiny_percentile_is_minimum() {
    let data = vec![3, -7, 99, 12, 0];
    assert_eq!(percentile(0.000_001, data).unwrap().quantile, -7);
    assert_eq!(nearest_rank(0.000_001, 5), 1);
}

#[test]
fn test_duplicates() {
    let data = vec![5, 5, 5, 1, 9, 9];

    assert_eq!(percentile(10.0, data.clone()).unwrap().quantile, 1);
    assert_eq!(percentile(50.0, data.clone()).unwrap().quantile, 5);
    assert_eq!(percentile(60.0, data.clone()).unwrap().quantile, 5);
    assert_eq!(percentile(90.0, data).unwrap().quantile, 9);
}

#[test]
fn test_order_does_not_matter() {
    let ascending: Vec<i64> = (0..101).collect();
    let mut shuffled = ascending.clone();
    shuffled.reverse();
    shuffled.swap(3, 70);
    shuffled.swap(10, 55);

    for p in [1.0, 12.5, 50.0, 77.7, 99.0, 100.0] {
        assert_eq!(
            percentile(p, ascending.clone()).unwrap(),
            percentile(p, shuffled.clone()).unwrap()
        );
    }
}

#[test]
fn test_total_is_len() {
    let q = percentile(42.0, vec![8; 37]).unwrap();
    assert_eq!(q, Quantile { quantile: 8, total: 37 });
}

#[test]
fn test_empty_is_invalid_input() {
    assert!(matches!(percentile(50.0, vec![]), Err(PoolError::InvalidInput(_))));
}

// =============================================================================
// Monotonicity
// =============================================================================

#[test]
fn test_monotonic_in_percentile() {
    let data: Vec<i64> = vec![40, -3, 17, 17, 250, 8, -90, 61, 0, 5, 33, 12, 7];

    let mut previous = i64::MIN;
    let mut p = 0.25;
    while p <= 100.0 {
        let q = percentile(p, data.clone()).unwrap().quantile;
        assert!(q >= previous, "quantile dropped at p={}: {} < {}", p, q, previous);
        previous = q;
        p += 0.25;
    }

    assert_eq!(previous, 250);
}

#[test]
fn test_rank_never_exceeds_total() {
    for total in 1..200usize {
        assert_eq!(nearest_rank(100.0, total), total);
        for p in [0.1, 33.3, 66.6, 99.99] {
            let rank = nearest_rank(p, total);
            assert!((1..=total).contains(&rank));
        }
    }
}
