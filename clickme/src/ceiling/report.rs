//! Serializable result archive of a ceiling run.
//!
//! Keyed maps use image keys or category names. NaN scores serialize as
//! `null` in JSON.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::agreement::AgreementMode;
use crate::click_parser::Trial;
use crate::dataset::category_of;
use crate::map_filter::Exclusion;
use crate::math::statistics::nan_percentile;

/// Dataset-level means.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub images_scored: usize,
    pub images_thresholded: usize,
    pub mean_ceiling_full: f64,
    pub mean_null_full: f64,
    pub mean_ceiling_thresholded: f64,
    pub mean_null_thresholded: f64,
}

/// Click-count percentiles of the surviving trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickPercentiles {
    pub percentile: f64,
    pub per_image: BTreeMap<String, f64>,
    pub per_category: BTreeMap<String, f64>,
    pub all: f64,
}

impl ClickPercentiles {
    pub fn compute<'a>(
        images: impl IntoIterator<Item = (&'a str, &'a [Trial])>,
        percentile: f64,
    ) -> Self {
        let mut per_image = BTreeMap::new();
        let mut by_category: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut all = Vec::new();

        for (key, trials) in images {
            let counts: Vec<f64> = trials.iter().map(|t| t.len() as f64).collect();
            per_image.insert(key.to_string(), nan_percentile(&counts, percentile));
            by_category
                .entry(category_of(key).to_string())
                .or_default()
                .extend_from_slice(&counts);
            all.extend_from_slice(&counts);
        }

        Self {
            percentile,
            per_image,
            per_category: by_category
                .into_iter()
                .map(|(category, counts)| (category, nan_percentile(&counts, percentile)))
                .collect(),
            all: nan_percentile(&all, percentile),
        }
    }
}

/// Counters and exclusions collected along the run.
///
/// Trial counters include trials of images that were later excluded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Trials rejected as empty annotations.
    pub empty_trials: usize,
    /// Trials rejected as unparseable.
    pub malformed_trials: usize,
    /// Trials outside the click-count bounds.
    pub out_of_click_range: usize,
    /// Trials whose map had too few non-zero pixels.
    pub below_min_pixels: usize,
    /// Clicks outside the image grid.
    pub dropped_points: usize,
    /// Images removed before scoring, with the reason.
    pub excluded: BTreeMap<String, Exclusion>,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CeilingReport {
    pub metric: String,
    pub mode: AgreementMode,
    pub summary: Summary,
    /// Median of the per-image mean null correlations.
    pub median_cutoff: f64,
    /// Mean agreement per image.
    pub ceiling_correlations: BTreeMap<String, f64>,
    /// Every per-subject (or per-split) score per image.
    pub subject_correlations: BTreeMap<String, Vec<f64>>,
    /// NaN-skipping mean of image agreements per category.
    pub category_correlations: BTreeMap<String, f64>,
    /// Dataset null mean per iteration.
    pub null_correlations: Vec<f64>,
    /// Null score per image, one per iteration.
    pub null_instance_correlations: BTreeMap<String, Vec<f64>>,
    /// Every null score of the category's images.
    pub null_category_correlations: BTreeMap<String, Vec<f64>>,
    pub final_clickmaps: BTreeMap<String, Vec<Trial>>,
    /// Images whose mean null correlation is below the cutoff.
    pub final_clickmaps_thresholded: BTreeMap<String, Vec<Trial>>,
    pub thresholded_all_correlations: BTreeMap<String, f64>,
    pub thresholded_null_correlations: BTreeMap<String, Vec<f64>>,
    pub click_percentiles: ClickPercentiles,
    pub diagnostics: Diagnostics,
}
