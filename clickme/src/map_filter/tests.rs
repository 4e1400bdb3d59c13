//! Tests for trial and image filtering.

use super::*;
use crate::click_parser::parse_clicks;
use crate::heatmap::{GaussianKernel, ImageShape};

fn builder() -> HeatmapBuilder {
    HeatmapBuilder::new(ImageShape::new(32, 32), GaussianKernel::new(5, 5f32.sqrt()), None)
}

fn thresholds(min_clicks: usize, max_clicks: usize, min_pixels: usize, min_subjects: usize) -> FilterThresholds {
    FilterThresholds {
        min_clicks,
        max_clicks,
        min_pixels,
        min_subjects,
    }
}

#[test]
fn test_click_bounds_are_inclusive() {
    let trials = vec![
        Trial::new(vec![(1, 1); 2]),
        Trial::new(vec![(1, 1); 3]),
        Trial::new(vec![(1, 1); 5]),
        Trial::new(vec![(1, 1); 6]),
    ];
    let kept = filter_by_clicks(&trials, 3, 5);
    assert_eq!(kept.iter().map(Trial::len).collect::<Vec<_>>(), vec![3, 5]);
}

#[test]
fn test_parsed_trials_scenario() {
    // The single-click trial never parses, the other two survive.
    let raw = ["[(10,10),(11,11)]", "[(10,10)]", "[(12,12),(10,10),(11,10)]"];
    let trials: Vec<Trial> = raw.iter().filter_map(|r| parse_clicks(r).ok()).collect();
    assert_eq!(trials.len(), 2);

    let filtered = filter_image(&trials, &builder(), &thresholds(2, 10, 0, 1)).unwrap();
    assert_eq!(filtered.trials.len(), 2);
    assert_eq!(filtered.maps.dims(), [2, 32, 32]);
    assert_eq!(filtered.counts, TrialCounts::default());
}

#[test]
fn test_no_trials_in_range_excludes_image() {
    let trials = vec![Trial::new(vec![(1, 1); 2])];
    let err = filter_image(&trials, &builder(), &thresholds(5, 10, 0, 1)).unwrap_err();
    assert_eq!(err.exclusion, Exclusion::NoTrialsInClickRange { parsed: 1 });
    assert_eq!(err.counts.out_of_click_range, 1);
}

#[test]
fn test_min_pixels_drops_sparse_maps() {
    let sparse = Trial::new(vec![(16, 16), (16, 16)]);
    let wide = Trial::new(vec![(4, 4), (16, 16), (28, 28)]);
    let wider = Trial::new(vec![(4, 28), (16, 4), (28, 16)]);
    // 5x5 footprint per distinct click
    let filtered = filter_image(
        &[sparse, wide.clone(), wider.clone()],
        &builder(),
        &thresholds(2, 10, 50, 1),
    )
    .unwrap();
    assert_eq!(filtered.trials, vec![wide, wider]);
    assert_eq!(filtered.counts.below_min_pixels, 1);
    assert_eq!(filtered.maps.len(), 2);
}

#[test]
fn test_too_few_subjects_excludes_image() {
    let trials = vec![
        Trial::new(vec![(4, 4), (5, 5)]),
        Trial::new(vec![(10, 10), (12, 12)]),
    ];
    let err = filter_image(&trials, &builder(), &thresholds(2, 10, 0, 3)).unwrap_err();
    assert_eq!(err.exclusion, Exclusion::TooFewSubjects { kept: 2, required: 3 });
}

#[test]
fn test_low_min_subjects_still_needs_two_maps() {
    let trials = vec![Trial::new(vec![(16, 16), (16, 16)])];
    for min_subjects in [0, 1] {
        let err = filter_image(&trials, &builder(), &thresholds(2, 10, 0, min_subjects)).unwrap_err();
        assert_eq!(err.exclusion, Exclusion::TooFewSubjects { kept: 1, required: 2 });
    }
}

#[test]
fn test_rejection_keeps_trial_counts() {
    let trials = vec![
        Trial::new(vec![(1, 1); 30]),
        Trial::new(vec![(16, 16), (16, 16)]),
        Trial::new(vec![(4, 4), (50, 50), (28, 28)]),
    ];
    let err = filter_image(&trials, &builder(), &thresholds(2, 10, 30, 2)).unwrap_err();
    assert_eq!(err.exclusion, Exclusion::TooFewSubjects { kept: 1, required: 2 });
    assert_eq!(
        err.counts,
        TrialCounts {
            out_of_click_range: 1,
            below_min_pixels: 1,
            dropped_points: 1,
        }
    );
}

#[test]
fn test_out_of_bounds_clicks_are_counted() {
    let trials = vec![
        Trial::new(vec![(4, 4), (40, 4), (5, 5)]),
        Trial::new(vec![(6, 6), (7, -1), (6, 7)]),
    ];
    let filtered = filter_image(&trials, &builder(), &thresholds(2, 10, 0, 1)).unwrap();
    assert_eq!(filtered.counts.dropped_points, 2);
}

#[test]
fn test_exclusion_serializes_with_reason_tag() {
    let json = serde_json::to_value(Exclusion::TooFewSubjects { kept: 1, required: 10 }).unwrap();
    assert_eq!(json["reason"], "too_few_subjects");
    assert_eq!(json["kept"], 1);
}
