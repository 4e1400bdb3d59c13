//! Agreement scoring between subjects, and the mismatched-image null.
//!
//! All functions are pure given their inputs and the injected random source.
//! Every per-comparison score may be NaN (degenerate map); aggregates use
//! NaN-skipping means.
//!
//! The null pairs each image's mean map with one random subject map from an
//! image of a *different* category. Same-category images are never drawn:
//! near-duplicate views of one object would inflate the chance baseline.


use std::collections::{BTreeSet, HashMap};

use common::parallel::TaskMap;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::heatmap::MapStack;
use crate::math::statistics::nan_mean;
use crate::metric::SimilarityMetric;

/// Resampling strategy for within-image agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementMode {
    /// Each subject against the mean of all other subjects.
    LeaveOneOut,
    /// Random halves of the subjects against each other.
    SplitHalf,
}

/// Split-half parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitHalfConfig {
    pub n_splits: usize,
    /// Draw subject indices with replacement instead of permuting.
    pub bootstrap: bool,
}

/// Scores of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAgreement {
    /// NaN-skipping mean of `scores`; NaN when nothing could be scored.
    pub mean: f64,
    /// One entry per subject (leave-one-out) or per split (split-half).
    pub scores: Vec<f64>,
}

impl ImageAgreement {
    fn from_scores(scores: Vec<f64>) -> Self {
        Self {
            mean: nan_mean(&scores),
            scores,
        }
    }

    fn undefined() -> Self {
        Self {
            mean: f64::NAN,
            scores: Vec::new(),
        }
    }
}

/// Each subject map against the mean of the remaining subjects.
///
/// Undefined (NaN, no scores) for fewer than two subjects.
pub fn leave_one_out<M: SimilarityMetric + ?Sized>(maps: &MapStack, metric: &M) -> ImageAgreement {
    if maps.len() < 2 {
        return ImageAgreement::undefined();
    }

    let scores = (0..maps.len())
        .map(|i| match maps.mean_excluding(i) {
            Some(rest) => metric.compare(maps.get(i), &rest),
            None => f64::NAN,
        })
        .collect();
    ImageAgreement::from_scores(scores)
}

/// Mean map of one random half of the subjects against the other half,
/// repeated `n_splits` times.
///
/// Undefined (NaN, no scores) for fewer than two subjects.
pub fn split_half<M, R>(
    maps: &MapStack,
    metric: &M,
    config: SplitHalfConfig,
    rng: &mut R,
) -> ImageAgreement
where
    M: SimilarityMetric + ?Sized,
    R: Rng + ?Sized,
{
    let n = maps.len();
    if n < 2 {
        return ImageAgreement::undefined();
    }
    let half = n / 2;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut scores = Vec::with_capacity(config.n_splits);
    for _ in 0..config.n_splits {
        if config.bootstrap {
            for slot in indices.iter_mut() {
                *slot = rng.random_range(0..n);
            }
        } else {
            indices.shuffle(rng);
        }

        let (first, second) = indices.split_at(half);
        let score = match (maps.mean_of(first), maps.mean_of(second)) {
            (Some(a), Some(b)) => metric.compare(&a, &b),
            _ => f64::NAN,
        };
        scores.push(score);
    }
    ImageAgreement::from_scores(scores)
}

/// Within-image agreement using the selected strategy.
pub fn image_agreement<M, R>(
    maps: &MapStack,
    metric: &M,
    mode: AgreementMode,
    split: SplitHalfConfig,
    rng: &mut R,
) -> ImageAgreement
where
    M: SimilarityMetric + ?Sized,
    R: Rng + ?Sized,
{
    match mode {
        AgreementMode::LeaveOneOut => leave_one_out(maps, metric),
        AgreementMode::SplitHalf => split_half(maps, metric, split, rng),
    }
}

/// Dense category index per image, numbered in sorted category-name order.
pub fn category_indices<S: AsRef<str>>(categories: &[S]) -> Vec<usize> {
    let unique: BTreeSet<&str> = categories.iter().map(AsRef::as_ref).collect();
    let index: HashMap<&str, usize> = unique.into_iter().enumerate().map(|(i, c)| (c, i)).collect();
    categories.iter().map(|c| index[c.as_ref()]).collect()
}

/// Candidate images of every other category, per category.
///
/// Built once per dataset so each null draw is a single pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryComplements {
    category_indices: Vec<usize>,
    /// `others[c]`: images whose category is not `c`, ascending.
    others: Vec<Vec<usize>>,
}

impl CategoryComplements {
    /// `category_indices` must be dense, as produced by [`category_indices`].
    pub fn new(category_indices: &[usize]) -> Self {
        let category_count = category_indices.iter().max().map_or(0, |&m| m + 1);
        let others = (0..category_count)
            .map(|category| {
                category_indices
                    .iter()
                    .enumerate()
                    .filter(|&(_, &c)| c != category)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        Self {
            category_indices: category_indices.to_vec(),
            others,
        }
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.category_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.category_indices.is_empty()
    }

    pub fn category_count(&self) -> usize {
        self.others.len()
    }

    /// Uniformly picks an image whose category differs from `image`'s.
    ///
    /// `None` when every image shares that category.
    pub fn sample<R: Rng + ?Sized>(&self, image: usize, rng: &mut R) -> Option<usize> {
        self.others[self.category_indices[image]].choose(rng).copied()
    }
}

/// One null comparison for `image`: its mean map against a random subject
/// of a random other-category image.
pub fn null_score<M, R>(
    image: usize,
    stacks: &[&MapStack],
    complements: &CategoryComplements,
    metric: &M,
    rng: &mut R,
) -> f64
where
    M: SimilarityMetric + ?Sized,
    R: Rng + ?Sized,
{
    let Some(reference) = stacks[image].mean() else {
        return f64::NAN;
    };
    let Some(other) = complements.sample(image, rng) else {
        return f64::NAN;
    };
    let other_stack = stacks[other];
    if other_stack.is_empty() {
        return f64::NAN;
    }
    let subject = rng.random_range(0..other_stack.len());
    metric.compare(other_stack.get(subject), &reference)
}

/// Per-image null scores of one iteration and their NaN-skipping mean.
#[derive(Debug, Clone, PartialEq)]
pub struct NullIteration {
    pub per_image: Vec<f64>,
    pub mean: f64,
}

/// Seed for the task at (`iteration`, `index`), derived from the run seed.
///
/// Each task gets its own generator so results do not depend on how tasks
/// are scheduled across threads.
pub fn task_seed(seed: u64, iteration: usize, index: usize) -> u64 {
    let mut z = seed
        ^ (iteration as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64).wrapping_add(1).wrapping_mul(0xD1B5_4A32_D192_ED03);
    // splitmix64 finalizer
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Null scores for every image in one iteration, fanned out over `executor`.
pub fn null_iteration<M, E>(
    stacks: &[&MapStack],
    complements: &CategoryComplements,
    metric: &M,
    seed: u64,
    iteration: usize,
    executor: &E,
) -> NullIteration
where
    M: SimilarityMetric + ?Sized,
    E: TaskMap,
{
    assert_eq!(
        stacks.len(),
        complements.len(),
        "one category index per image required"
    );
    let per_image = executor.map_tasks(stacks.len(), |image| {
        let mut rng = ChaCha8Rng::seed_from_u64(task_seed(seed, iteration, image));
        null_score(image, stacks, complements, metric, &mut rng)
    });
    NullIteration {
        mean: nan_mean(&per_image),
        per_image,
    }
}
