//! End-to-end ceiling estimation.
//!
//! A run moves strictly forward through
//! `Load → Parse → Filter → Score → NullScore → Threshold → Export`.
//! Loading rows and writing the report are done by the caller; the runner
//! starts in `Load` with rows already in memory and ends in `Export` by
//! returning a [`CeilingReport`].
//!
//! The threshold stage keeps images whose mean null correlation is strictly
//! below the dataset median, i.e. the half least inflated by chance
//! agreement. It is a heuristic split, not a statistical test.

mod config;
mod error;
mod report;


use std::collections::BTreeMap;

use common::parallel::{RayonPool, Sequential, TaskMap};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strum_macros::Display;

pub use config::CeilingConfig;
pub use error::{ConfigError, RunError};
pub use report::{CeilingReport, ClickPercentiles, Diagnostics, Summary};

use crate::agreement::{
    category_indices, image_agreement, null_iteration, task_seed, CategoryComplements,
    ImageAgreement, NullIteration,
};
use crate::click_parser::{parse_clicks, ParseError, Trial};
use crate::dataset::{category_of, RawImage};
use crate::heatmap::{HeatmapBuilder, MapStack};
use crate::map_filter::{filter_image, Exclusion, FilteredImage, Rejection, TrialCounts};
use crate::math::statistics::{nan_mean, nan_median};
use crate::metric::Metric;

/// Task-seed iteration slot reserved for within-image scoring.
const SCORE_STREAM: usize = usize::MAX;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Load,
    Parse,
    Filter,
    Score,
    NullScore,
    Threshold,
    Export,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Self::Load => Some(Self::Parse),
            Self::Parse => Some(Self::Filter),
            Self::Filter => Some(Self::Score),
            Self::Score => Some(Self::NullScore),
            Self::NullScore => Some(Self::Threshold),
            Self::Threshold => Some(Self::Export),
            Self::Export => None,
        }
    }
}

/// Parsed trials of one image.
#[derive(Debug, Clone)]
pub struct ParsedImage {
    pub key: String,
    pub category: String,
    pub trials: Vec<Trial>,
}

/// An image that passed filtering.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub key: String,
    pub category: String,
    pub filtered: FilteredImage,
}

/// Filtered images plus their category index for null sampling.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub images: Vec<PreparedImage>,
    pub category_indices: Vec<usize>,
}

/// Null scores of every iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct NullScores {
    /// Dataset mean per iteration.
    pub per_iteration: Vec<f64>,
    /// `per_image[i][iteration]`.
    pub per_image: Vec<Vec<f64>>,
}

/// Outcome of the median split.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdResult {
    /// NaN-skipping mean null correlation per image.
    pub mean_null_per_image: Vec<f64>,
    pub median_cutoff: f64,
    /// Indices of retained images, ascending.
    pub retained: Vec<usize>,
}

/// Keeps the images whose value is strictly below the NaN-skipping median.
/// NaN values are never retained.
pub fn median_threshold(mean_null_per_image: &[f64]) -> ThresholdResult {
    let median_cutoff = nan_median(mean_null_per_image);
    let retained = mean_null_per_image
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v < median_cutoff)
        .map(|(i, _)| i)
        .collect();
    ThresholdResult {
        mean_null_per_image: mean_null_per_image.to_vec(),
        median_cutoff,
        retained,
    }
}

fn fan_out<T, F>(parallel: bool, count: usize, task: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    if parallel {
        RayonPool.map_tasks(count, task)
    } else {
        Sequential.map_tasks(count, task)
    }
}

/// Stateful driver of one ceiling run.
#[derive(Debug)]
pub struct CeilingRunner {
    config: CeilingConfig,
    metric: Metric,
    builder: HeatmapBuilder,
    stage: Stage,
    diagnostics: Diagnostics,
}

impl CeilingRunner {
    /// Validates `config`. Any configuration problem is fatal here.
    pub fn new(config: CeilingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let metric = config.metric()?;
        let builder = config.heatmap_builder();
        tracing::info!(
            metric = %metric,
            mode = ?config.mode,
            blur_size = config.blur_size,
            blur_sigma = config.blur_sigma(),
            min_pixels = config.min_pixels(),
            "Configured ceiling run"
        );
        Ok(Self {
            config,
            metric,
            builder,
            stage: Stage::Load,
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn config(&self) -> &CeilingConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn tally(&mut self, counts: TrialCounts) {
        self.diagnostics.out_of_click_range += counts.out_of_click_range;
        self.diagnostics.below_min_pixels += counts.below_min_pixels;
        self.diagnostics.dropped_points += counts.dropped_points;
    }

    fn enter(&mut self, to: Stage) -> Result<(), RunError> {
        if self.stage.next() != Some(to) {
            return Err(RunError::StageOrder {
                from: self.stage,
                to,
            });
        }
        tracing::debug!(from = %self.stage, to = %to, "Stage transition");
        self.stage = to;
        Ok(())
    }

    /// Parses every serialized trial. Rejected trials are counted; images
    /// left without trials are excluded.
    pub fn parse(&mut self, images: Vec<RawImage>) -> Result<Vec<ParsedImage>, RunError> {
        self.enter(Stage::Parse)?;

        let mut parsed = Vec::with_capacity(images.len());
        for image in images {
            let mut trials = Vec::with_capacity(image.clicks.len());
            for raw in &image.clicks {
                match parse_clicks(raw) {
                    Ok(trial) => trials.push(trial),
                    Err(ParseError::Empty { .. }) => self.diagnostics.empty_trials += 1,
                    Err(err @ ParseError::Malformed { .. }) => {
                        tracing::debug!(image = %image.key, error = %err, "Skipping malformed trial");
                        self.diagnostics.malformed_trials += 1;
                    }
                }
            }

            if trials.is_empty() {
                self.diagnostics.excluded.insert(
                    image.key,
                    Exclusion::NoParsedTrials {
                        rejected: image.clicks.len(),
                    },
                );
                continue;
            }
            parsed.push(ParsedImage {
                category: category_of(&image.key).to_string(),
                key: image.key,
                trials,
            });
        }

        tracing::info!(
            images = parsed.len(),
            empty_trials = self.diagnostics.empty_trials,
            malformed_trials = self.diagnostics.malformed_trials,
            "Parsed click data"
        );
        Ok(parsed)
    }

    /// Applies the click-count and pixel gates, rendering every trial.
    pub fn filter(&mut self, images: Vec<ParsedImage>) -> Result<PreparedDataset, RunError> {
        self.enter(Stage::Filter)?;

        let thresholds = self.config.thresholds();
        let builder = &self.builder;
        let results = fan_out(self.config.parallel, images.len(), |i| {
            filter_image(&images[i].trials, builder, &thresholds)
        });

        let mut prepared = Vec::with_capacity(images.len());
        for (image, result) in images.into_iter().zip(results) {
            match result {
                Ok(filtered) => {
                    self.tally(filtered.counts);
                    prepared.push(PreparedImage {
                        key: image.key,
                        category: image.category,
                        filtered,
                    });
                }
                Err(Rejection { exclusion, counts }) => {
                    tracing::debug!(image = %image.key, reason = ?exclusion, "Excluding image");
                    self.tally(counts);
                    self.diagnostics.excluded.insert(image.key, exclusion);
                }
            }
        }

        if !self.diagnostics.excluded.is_empty() {
            tracing::warn!(
                excluded = self.diagnostics.excluded.len(),
                kept = prepared.len(),
                "Images excluded for insufficient data"
            );
        }

        let categories: Vec<&str> = prepared.iter().map(|p| p.category.as_str()).collect();
        let category_indices = category_indices(&categories);
        Ok(PreparedDataset {
            images: prepared,
            category_indices,
        })
    }

    /// Within-image agreement per image.
    pub fn score(&mut self, dataset: &PreparedDataset) -> Result<Vec<ImageAgreement>, RunError> {
        self.enter(Stage::Score)?;

        let metric = &self.metric;
        let mode = self.config.mode;
        let split = self.config.split_half();
        let seed = self.config.seed;
        let scores = fan_out(self.config.parallel, dataset.images.len(), |i| {
            let mut rng = ChaCha8Rng::seed_from_u64(task_seed(seed, SCORE_STREAM, i));
            image_agreement(&dataset.images[i].filtered.maps, metric, mode, split, &mut rng)
        });

        for (image, score) in dataset.images.iter().zip(&scores) {
            tracing::debug!(image = %image.key, score = score.mean, "Image agreement");
        }
        let means: Vec<f64> = scores.iter().map(|s| s.mean).collect();
        tracing::info!(
            images = scores.len(),
            mean = nan_mean(&means),
            "Scored within-image agreement"
        );
        Ok(scores)
    }

    /// Mismatched-category null over `null_iterations` iterations.
    pub fn null_score(&mut self, dataset: &PreparedDataset) -> Result<NullScores, RunError> {
        self.enter(Stage::NullScore)?;

        let stacks: Vec<&MapStack> = dataset
            .images
            .iter()
            .map(|image| &image.filtered.maps)
            .collect();
        let complements = CategoryComplements::new(&dataset.category_indices);
        if complements.category_count() < 2 && !stacks.is_empty() {
            tracing::warn!("Fewer than two categories; every null score is NaN");
        }

        let mut per_iteration = Vec::with_capacity(self.config.null_iterations);
        let mut per_image = vec![Vec::with_capacity(self.config.null_iterations); stacks.len()];
        for iteration in 0..self.config.null_iterations {
            let NullIteration {
                per_image: scores,
                mean,
            } = if self.config.parallel {
                null_iteration(
                    &stacks,
                    &complements,
                    &self.metric,
                    self.config.seed,
                    iteration,
                    &RayonPool,
                )
            } else {
                null_iteration(
                    &stacks,
                    &complements,
                    &self.metric,
                    self.config.seed,
                    iteration,
                    &Sequential,
                )
            };
            for (image_scores, score) in per_image.iter_mut().zip(scores) {
                image_scores.push(score);
            }
            tracing::debug!(iteration, mean, "Null iteration");
            per_iteration.push(mean);
        }

        tracing::info!(
            iterations = per_iteration.len(),
            mean = nan_mean(&per_iteration),
            "Computed null distribution"
        );
        Ok(NullScores {
            per_iteration,
            per_image,
        })
    }

    /// Median split on per-image mean null correlations.
    pub fn threshold(&mut self, nulls: &NullScores) -> Result<ThresholdResult, RunError> {
        self.enter(Stage::Threshold)?;

        let means: Vec<f64> = nulls.per_image.iter().map(|v| nan_mean(v)).collect();
        let result = median_threshold(&means);
        tracing::info!(
            median_cutoff = result.median_cutoff,
            retained = result.retained.len(),
            of = means.len(),
            "Thresholded images by null correlation"
        );
        Ok(result)
    }

    /// Assembles the report and finishes the run.
    pub fn export(
        &mut self,
        dataset: &PreparedDataset,
        scores: &[ImageAgreement],
        nulls: &NullScores,
        threshold: &ThresholdResult,
    ) -> Result<CeilingReport, RunError> {
        self.enter(Stage::Export)?;

        let images = &dataset.images;
        let mut ceiling_correlations = BTreeMap::new();
        let mut subject_correlations = BTreeMap::new();
        let mut by_category: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut null_instance_correlations = BTreeMap::new();
        let mut null_category_correlations: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut final_clickmaps = BTreeMap::new();

        for (i, image) in images.iter().enumerate() {
            ceiling_correlations.insert(image.key.clone(), scores[i].mean);
            subject_correlations.insert(image.key.clone(), scores[i].scores.clone());
            by_category
                .entry(image.category.clone())
                .or_default()
                .push(scores[i].mean);
            null_instance_correlations.insert(image.key.clone(), nulls.per_image[i].clone());
            null_category_correlations
                .entry(image.category.clone())
                .or_default()
                .extend_from_slice(&nulls.per_image[i]);
            final_clickmaps.insert(image.key.clone(), image.filtered.trials.clone());
        }

        let mut final_clickmaps_thresholded = BTreeMap::new();
        let mut thresholded_all_correlations = BTreeMap::new();
        let mut thresholded_null_correlations = BTreeMap::new();
        let mut retained_scores = Vec::with_capacity(threshold.retained.len());
        let mut retained_nulls = Vec::new();
        for &i in &threshold.retained {
            let key = &images[i].key;
            final_clickmaps_thresholded.insert(key.clone(), images[i].filtered.trials.clone());
            thresholded_all_correlations.insert(key.clone(), scores[i].mean);
            thresholded_null_correlations.insert(key.clone(), nulls.per_image[i].clone());
            retained_scores.push(scores[i].mean);
            retained_nulls.extend_from_slice(&nulls.per_image[i]);
        }

        let all_scores: Vec<f64> = scores.iter().map(|s| s.mean).collect();
        let summary = Summary {
            images_scored: images.len(),
            images_thresholded: threshold.retained.len(),
            mean_ceiling_full: nan_mean(&all_scores),
            mean_null_full: nan_mean(&nulls.per_iteration),
            mean_ceiling_thresholded: nan_mean(&retained_scores),
            mean_null_thresholded: nan_mean(&retained_nulls),
        };
        tracing::info!(
            mean_ceiling_full = summary.mean_ceiling_full,
            mean_null_full = summary.mean_null_full,
            mean_ceiling_thresholded = summary.mean_ceiling_thresholded,
            mean_null_thresholded = summary.mean_null_thresholded,
            "Human ceiling"
        );

        let click_percentiles = ClickPercentiles::compute(
            images
                .iter()
                .map(|image| (image.key.as_str(), image.filtered.trials.as_slice())),
            self.config.percentile,
        );

        Ok(CeilingReport {
            metric: self.metric.to_string(),
            mode: self.config.mode,
            summary,
            median_cutoff: threshold.median_cutoff,
            ceiling_correlations,
            subject_correlations,
            category_correlations: by_category
                .into_iter()
                .map(|(category, values)| (category, nan_mean(&values)))
                .collect(),
            null_correlations: nulls.per_iteration.clone(),
            null_instance_correlations,
            null_category_correlations,
            final_clickmaps,
            final_clickmaps_thresholded,
            thresholded_all_correlations,
            thresholded_null_correlations,
            click_percentiles,
            diagnostics: self.diagnostics.clone(),
        })
    }

    /// Runs every stage after `Load` on already loaded images.
    pub fn run(config: CeilingConfig, images: Vec<RawImage>) -> Result<CeilingReport, RunError> {
        let mut runner = Self::new(config)?;
        let parsed = runner.parse(images)?;
        let dataset = runner.filter(parsed)?;
        let scores = runner.score(&dataset)?;
        let nulls = runner.null_score(&dataset)?;
        let threshold = runner.threshold(&nulls)?;
        runner.export(&dataset, &scores, &nulls, &threshold)
    }
}
