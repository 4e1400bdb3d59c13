//! Tests for NaN-aware statistics.

use super::*;

// ---------------------------------------------------------------------------
// Mean / median
// ---------------------------------------------------------------------------

#[test]
fn test_nan_mean_skips_nan() {
    let values = [1.0, f64::NAN, 3.0];
    assert!((nan_mean(&values) - 2.0).abs() < 1e-12);
}

#[test]
fn test_nan_mean_all_nan_is_nan() {
    assert!(nan_mean(&[f64::NAN, f64::NAN]).is_nan());
    assert!(nan_mean(&[]).is_nan());
}

#[test]
fn test_median_odd_even() {
    let mut odd = [5.0, 1.0, 3.0];
    assert_eq!(median_f64_mut(&mut odd), 3.0);
    let mut even = [0.1, 0.5, 0.9, 0.3];
    assert!((median_f64_mut(&mut even) - 0.4).abs() < 1e-12);
}

#[test]
fn test_nan_median() {
    assert!((nan_median(&[f64::NAN, 2.0, 4.0]) - 3.0).abs() < 1e-12);
    assert!(nan_median(&[f64::NAN]).is_nan());
}

// ---------------------------------------------------------------------------
// Percentile
// ---------------------------------------------------------------------------

#[test]
fn test_percentile_matches_linear_interpolation() {
    let values = [10.0, 20.0, 30.0, 40.0];
    assert_eq!(nan_percentile(&values, 0.0), 10.0);
    assert_eq!(nan_percentile(&values, 100.0), 40.0);
    assert!((nan_percentile(&values, 50.0) - 25.0).abs() < 1e-12);
    assert!((nan_percentile(&values, 25.0) - 17.5).abs() < 1e-12);
}

#[test]
#[should_panic(expected = "percentile must be in [0, 100]")]
fn test_percentile_out_of_range_panics() {
    nan_percentile(&[1.0], 101.0);
}

// ---------------------------------------------------------------------------
// Ranks / correlation
// ---------------------------------------------------------------------------

#[test]
fn test_average_ranks_with_ties() {
    let ranks = average_ranks(&[10.0, 20.0, 10.0, 30.0]);
    assert_eq!(ranks, vec![1.5, 3.0, 1.5, 4.0]);
}

#[test]
fn test_pearson_perfect_and_inverse() {
    let a = [1.0, 2.0, 3.0, 4.0];
    let b = [2.0, 4.0, 6.0, 8.0];
    let c = [4.0, 3.0, 2.0, 1.0];
    assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
    assert!((pearson(&a, &c) + 1.0).abs() < 1e-12);
}

#[test]
fn test_pearson_degenerate_is_nan() {
    assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    assert!(pearson(&[1.0], &[1.0]).is_nan());
}
