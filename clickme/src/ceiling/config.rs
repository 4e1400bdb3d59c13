//! Run configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::VariantNames;

use crate::agreement::{AgreementMode, SplitHalfConfig};
use crate::ceiling::ConfigError;
use crate::heatmap::{GaussianKernel, HeatmapBuilder, ImageShape};
use crate::map_filter::FilterThresholds;
use crate::metric::Metric;

/// All knobs of a ceiling run.
///
/// Every field has a default, so a config file only lists overrides:
///
/// ```yaml
/// blur_size: 11
/// metric: spearman
/// center_crop: [224, 224]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CeilingConfig {
    /// Gaussian kernel width in pixels (odd).
    pub blur_size: usize,
    /// Kernel sigma. Defaults to `sqrt(blur_size)`.
    pub blur_sigma: Option<f32>,
    /// Fewest clicks a trial may have.
    pub min_clicks: usize,
    /// Most clicks a trial may have.
    pub max_clicks: usize,
    /// Fewest non-zero pixels a smoothed map needs. Defaults to
    /// `(2 * blur_size)^2`.
    pub min_pixels: Option<usize>,
    /// Fewest surviving maps an image needs.
    pub min_subjects: usize,
    /// Grid clicks are scattered onto, `[height, width]`.
    pub image_shape: ImageShape,
    /// Center crop applied after smoothing, `[height, width]`.
    pub center_crop: Option<ImageShape>,
    /// Within-image resampling strategy.
    pub mode: AgreementMode,
    /// Split-half iterations per image.
    pub n_splits: usize,
    /// Resample subjects with replacement in split-half mode.
    pub bootstrap: bool,
    /// Null iterations over the whole dataset.
    pub null_iterations: usize,
    /// One of `crossentropy`, `spearman`, `auc`, `rsa` (any case).
    pub metric: String,
    /// Seed of every random draw in the run.
    pub seed: u64,
    /// Fan per-image work out over the rayon pool.
    pub parallel: bool,
    /// Percentile reported for click counts.
    pub percentile: f64,
}

impl Default for CeilingConfig {
    fn default() -> Self {
        Self {
            blur_size: 21,
            blur_sigma: None,
            min_clicks: 10,
            max_clicks: 75,
            min_pixels: None,
            min_subjects: 10,
            image_shape: ImageShape::new(256, 256),
            center_crop: Some(ImageShape::new(224, 224)),
            mode: AgreementMode::LeaveOneOut,
            n_splits: 1000,
            bootstrap: false,
            null_iterations: 10,
            metric: "auc".to_string(),
            seed: 0,
            parallel: true,
            percentile: 50.0,
        }
    }
}

impl CeilingConfig {
    pub fn blur_sigma(&self) -> f32 {
        self.blur_sigma
            .unwrap_or_else(|| (self.blur_size as f32).sqrt())
    }

    pub fn min_pixels(&self) -> usize {
        self.min_pixels
            .unwrap_or_else(|| (2 * self.blur_size).pow(2))
    }

    /// Resolves the metric name. Unknown names are a fatal error.
    pub fn metric(&self) -> Result<Metric, ConfigError> {
        Metric::from_str(self.metric.trim()).map_err(|_| ConfigError::UnknownMetric {
            name: self.metric.clone(),
            expected: Metric::VARIANTS.join(", "),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blur_size == 0 || self.blur_size % 2 == 0 {
            return Err(ConfigError::InvalidBlurSize(self.blur_size));
        }
        let sigma = self.blur_sigma();
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(ConfigError::InvalidBlurSigma(sigma));
        }
        if self.image_shape.height == 0 || self.image_shape.width == 0 {
            return Err(ConfigError::EmptyImageShape(self.image_shape));
        }
        if let Some(crop) = self.center_crop {
            if crop.height == 0 || crop.width == 0 {
                return Err(ConfigError::EmptyImageShape(crop));
            }
            if !crop.fits_within(&self.image_shape) {
                return Err(ConfigError::CropExceedsImage {
                    crop,
                    image: self.image_shape,
                });
            }
        }
        if self.min_clicks > self.max_clicks {
            return Err(ConfigError::InvertedClickBounds {
                min: self.min_clicks,
                max: self.max_clicks,
            });
        }
        if self.mode == AgreementMode::SplitHalf && self.n_splits == 0 {
            return Err(ConfigError::ZeroSplits);
        }
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(ConfigError::PercentileOutOfRange(self.percentile));
        }
        self.metric()?;
        Ok(())
    }

    pub fn thresholds(&self) -> FilterThresholds {
        FilterThresholds {
            min_clicks: self.min_clicks,
            max_clicks: self.max_clicks,
            min_pixels: self.min_pixels(),
            min_subjects: self.min_subjects,
        }
    }

    /// Builder for this config. Call [`Self::validate`] first.
    pub fn heatmap_builder(&self) -> HeatmapBuilder {
        HeatmapBuilder::new(
            self.image_shape,
            GaussianKernel::new(self.blur_size, self.blur_sigma()),
            self.center_crop,
        )
    }

    pub fn split_half(&self) -> SplitHalfConfig {
        SplitHalfConfig {
            n_splits: self.n_splits,
            bootstrap: self.bootstrap,
        }
    }
}
