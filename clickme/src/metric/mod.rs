//! Similarity metrics between two equally shaped maps.
//!
//! Every metric declares the [`Normalization`] its operands must already
//! have. [`SimilarityMetric::score`] does not normalize; callers either apply
//! [`Normalization::apply`] themselves or go through
//! [`SimilarityMetric::compare`], which does both.
//!
//! Degenerate operands score NaN instead of erroring: fewer than two finite
//! values, a sum of exactly zero, or a range of exactly zero.


use strum_macros::{Display, EnumString, VariantNames};

use crate::common::Buffer2;
use crate::heatmap::{normalize_min_max, normalize_sum};
use crate::math::statistics::{average_ranks, pearson};

/// Probability floor used inside the cross-entropy logarithm.
pub const CROSS_ENTROPY_FLOOR: f64 = 1e-12;

/// Rescaling a map must undergo before a metric may score it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Divide by the sum so the map is a probability distribution.
    Probability,
    /// Rescale to `[0, 1]`.
    MinMax,
}

impl Normalization {
    /// `None` when the map sum (Probability) or range (MinMax) is zero.
    pub fn apply(self, map: &Buffer2<f32>) -> Option<Buffer2<f32>> {
        match self {
            Self::Probability => normalize_sum(map),
            Self::MinMax => normalize_min_max(map),
        }
    }
}

/// A scoring function over two same-shape maps.
pub trait SimilarityMetric: Sync {
    /// Normalization both operands must have before [`Self::score`].
    fn normalization(&self) -> Normalization;

    /// Scores `test` against `reference`.
    ///
    /// Precondition: both operands are normalized per [`Self::normalization`].
    fn score(&self, test: &Buffer2<f32>, reference: &Buffer2<f32>) -> f64;

    /// Normalizes both operands then scores. NaN if either cannot be
    /// normalized.
    fn compare(&self, test: &Buffer2<f32>, reference: &Buffer2<f32>) -> f64 {
        let normalization = self.normalization();
        match (normalization.apply(test), normalization.apply(reference)) {
            (Some(test), Some(reference)) => self.score(&test, &reference),
            _ => f64::NAN,
        }
    }
}

/// Built-in metrics, selectable by case-insensitive name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Metric {
    /// Cross-entropy of the test map under the reference distribution.
    /// Lower is better.
    CrossEntropy,
    /// Spearman rank correlation over all pixels.
    Spearman,
    /// ROC AUC of the test map predicting above-mean reference pixels.
    Auc,
    /// Representational similarity: Spearman correlation between the
    /// row-pattern dissimilarity matrices of both maps.
    Rsa,
}

impl Metric {
    /// Whether larger scores mean stronger agreement.
    pub fn higher_is_better(self) -> bool {
        !matches!(self, Self::CrossEntropy)
    }
}

impl SimilarityMetric for Metric {
    fn normalization(&self) -> Normalization {
        match self {
            Self::CrossEntropy => Normalization::Probability,
            Self::Spearman | Self::Auc | Self::Rsa => Normalization::MinMax,
        }
    }

    fn score(&self, test: &Buffer2<f32>, reference: &Buffer2<f32>) -> f64 {
        match self {
            Self::CrossEntropy => cross_entropy(test, reference),
            Self::Spearman => spearman(test, reference),
            Self::Auc => auc(test, reference),
            Self::Rsa => rsa(test, reference),
        }
    }
}

fn check_shapes(a: &Buffer2<f32>, b: &Buffer2<f32>) {
    assert_eq!(
        a.shape(),
        b.shape(),
        "metric operands must have the same shape"
    );
}

/// True when a map cannot carry a meaningful score.
pub fn is_degenerate(map: &Buffer2<f32>) -> bool {
    if map.pixels().iter().filter(|v| v.is_finite()).count() < 2 {
        return true;
    }
    if map.sum() == 0.0 {
        return true;
    }
    match map.min_max() {
        Some((lo, hi)) => lo == hi,
        None => true,
    }
}

fn to_f64(map: &Buffer2<f32>) -> Vec<f64> {
    map.pixels().iter().map(|&v| v as f64).collect()
}

/// `-Σ reference · ln(test)`, with `test` floored at [`CROSS_ENTROPY_FLOOR`].
///
/// Precondition: both maps sum to 1.
pub fn cross_entropy(test: &Buffer2<f32>, reference: &Buffer2<f32>) -> f64 {
    check_shapes(test, reference);
    if is_degenerate(test) || is_degenerate(reference) {
        return f64::NAN;
    }
    -test
        .pixels()
        .iter()
        .zip(reference.pixels())
        .filter(|(_, r)| **r > 0.0)
        .map(|(&t, &r)| r as f64 * (t as f64).max(CROSS_ENTROPY_FLOOR).ln())
        .sum::<f64>()
}

/// Spearman rank correlation with average ranks for ties.
///
/// Precondition: both maps are min-max normalized.
pub fn spearman(a: &Buffer2<f32>, b: &Buffer2<f32>) -> f64 {
    check_shapes(a, b);
    if is_degenerate(a) || is_degenerate(b) {
        return f64::NAN;
    }
    pearson(&average_ranks(&to_f64(a)), &average_ranks(&to_f64(b)))
}

/// Area under the ROC curve for `test` scores separating reference pixels
/// above the reference mean (positives) from the rest.
///
/// Computed through the Mann-Whitney U statistic with average ranks.
/// Precondition: both maps are min-max normalized.
pub fn auc(test: &Buffer2<f32>, reference: &Buffer2<f32>) -> f64 {
    check_shapes(test, reference);
    if is_degenerate(test) || is_degenerate(reference) {
        return f64::NAN;
    }

    let threshold = reference.sum() / reference.len() as f64;
    let ranks = average_ranks(&to_f64(test));

    let mut n_pos = 0usize;
    let mut rank_sum = 0.0f64;
    for (&r, &rank) in reference.pixels().iter().zip(&ranks) {
        if r as f64 > threshold {
            n_pos += 1;
            rank_sum += rank;
        }
    }
    let n_neg = ranks.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let u = rank_sum - (n_pos * (n_pos + 1)) as f64 * 0.5;
    u / (n_pos as f64 * n_neg as f64)
}

/// Upper triangle of the Euclidean distance matrix between map rows.
fn row_dissimilarities(map: &Buffer2<f32>) -> Vec<f64> {
    let height = map.height();
    let mut out = Vec::with_capacity(height * height.saturating_sub(1) / 2);
    for i in 0..height {
        let row_i = map.row(i);
        for j in i + 1..height {
            let dist_sq: f64 = row_i
                .iter()
                .zip(map.row(j))
                .map(|(&a, &b)| {
                    let d = a as f64 - b as f64;
                    d * d
                })
                .sum();
            out.push(dist_sq.sqrt());
        }
    }
    out
}

/// Representational similarity between two maps.
///
/// Each map is summarized by the pairwise distances between its rows; the
/// score is the Spearman correlation of the two distance sets.
/// Precondition: both maps are min-max normalized.
pub fn rsa(a: &Buffer2<f32>, b: &Buffer2<f32>) -> f64 {
    check_shapes(a, b);
    if is_degenerate(a) || is_degenerate(b) {
        return f64::NAN;
    }
    let da = row_dissimilarities(a);
    let db = row_dissimilarities(b);
    if da.len() < 2 {
        return f64::NAN;
    }
    pearson(&average_ranks(&da), &average_ranks(&db))
}
