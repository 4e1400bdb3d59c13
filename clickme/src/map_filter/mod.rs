//! Data-sufficiency filtering of trials and images.
//!
//! Two gates, applied in order:
//! 1. trials whose click count lies outside `[min_clicks, max_clicks]` are
//!    dropped;
//! 2. each remaining trial is rendered, and maps with fewer than
//!    `min_pixels` non-zero pixels are dropped. The image survives only if
//!    at least `min_subjects` maps remain, and never with fewer than
//!    [`MIN_SCORABLE_SUBJECTS`]: agreement needs two subjects to compare.

#[cfg(test)]
mod tests;

use serde::Serialize;

use crate::click_parser::Trial;
use crate::heatmap::{HeatmapBuilder, MapStack};

/// Fewest subject maps an image can be scored with.
pub const MIN_SCORABLE_SUBJECTS: usize = 2;

/// Inclusion thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterThresholds {
    pub min_clicks: usize,
    pub max_clicks: usize,
    pub min_pixels: usize,
    pub min_subjects: usize,
}

/// Why an image did not reach scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Exclusion {
    /// Every trial failed to parse.
    NoParsedTrials { rejected: usize },
    /// No parsed trial had a click count within bounds.
    NoTrialsInClickRange { parsed: usize },
    /// Too few maps met the pixel threshold.
    TooFewSubjects { kept: usize, required: usize },
}

/// Per-trial tallies of both gates, collected whether or not the image
/// survives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialCounts {
    /// Trials dropped by the click-count gate.
    pub out_of_click_range: usize,
    /// Trials dropped by the pixel gate.
    pub below_min_pixels: usize,
    /// Clicks that fell outside the image grid.
    pub dropped_points: usize,
}

/// An image that failed a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub exclusion: Exclusion,
    pub counts: TrialCounts,
}

/// Trials and maps of an image that passed every gate.
#[derive(Debug, Clone)]
pub struct FilteredImage {
    pub trials: Vec<Trial>,
    pub maps: MapStack,
    pub counts: TrialCounts,
}

/// Keeps trials whose click count lies in `[min_clicks, max_clicks]`.
pub fn filter_by_clicks(trials: &[Trial], min_clicks: usize, max_clicks: usize) -> Vec<Trial> {
    trials
        .iter()
        .filter(|t| (min_clicks..=max_clicks).contains(&t.len()))
        .cloned()
        .collect()
}

/// Runs both gates over one image's parsed trials.
pub fn filter_image(
    trials: &[Trial],
    builder: &HeatmapBuilder,
    thresholds: &FilterThresholds,
) -> Result<FilteredImage, Rejection> {
    let in_range = filter_by_clicks(trials, thresholds.min_clicks, thresholds.max_clicks);
    let mut counts = TrialCounts {
        out_of_click_range: trials.len() - in_range.len(),
        ..TrialCounts::default()
    };
    if in_range.is_empty() {
        return Err(Rejection {
            exclusion: Exclusion::NoTrialsInClickRange {
                parsed: trials.len(),
            },
            counts,
        });
    }

    let mut kept_trials = Vec::with_capacity(in_range.len());
    let mut maps = Vec::with_capacity(in_range.len());
    for trial in in_range {
        let clickmap = builder.build(&trial);
        counts.dropped_points += clickmap.dropped_points;
        if clickmap.map.count_nonzero() >= thresholds.min_pixels {
            maps.push(clickmap.map);
            kept_trials.push(trial);
        } else {
            counts.below_min_pixels += 1;
        }
    }

    let required = thresholds.min_subjects.max(MIN_SCORABLE_SUBJECTS);
    if maps.len() < required {
        return Err(Rejection {
            exclusion: Exclusion::TooFewSubjects {
                kept: maps.len(),
                required,
            },
            counts,
        });
    }

    Ok(FilteredImage {
        trials: kept_trials,
        maps: MapStack::new(builder.output_shape(), maps),
        counts,
    })
}
