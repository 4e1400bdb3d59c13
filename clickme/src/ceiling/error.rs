//! Error types for ceiling runs.

use thiserror::Error;

use crate::ceiling::Stage;
use crate::heatmap::ImageShape;

/// Invalid run configuration. Always fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Unknown metric '{name}', expected one of: {expected}")]
    UnknownMetric { name: String, expected: String },

    #[error("Blur size must be odd and positive, got {0}")]
    InvalidBlurSize(usize),

    #[error("Blur sigma must be positive and finite, got {0}")]
    InvalidBlurSigma(f32),

    #[error("Image shape must be non-empty, got {0:?}")]
    EmptyImageShape(ImageShape),

    #[error("Center crop {crop:?} exceeds image shape {image:?}")]
    CropExceedsImage { crop: ImageShape, image: ImageShape },

    #[error("min_clicks ({min}) exceeds max_clicks ({max})")]
    InvertedClickBounds { min: usize, max: usize },

    #[error("Split-half scoring needs at least one split")]
    ZeroSplits,

    #[error("Percentile must lie in [0, 100], got {0}")]
    PercentileOutOfRange(f64),
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Stage {to} cannot follow {from}")]
    StageOrder { from: Stage, to: Stage },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_metric_message() {
        let err = ConfigError::UnknownMetric {
            name: "pearson".to_string(),
            expected: "auc, rsa".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pearson"));
        assert!(msg.contains("auc, rsa"));
    }

    #[test]
    fn test_stage_order_message() {
        let err = RunError::StageOrder {
            from: Stage::Threshold,
            to: Stage::Score,
        };
        assert_eq!(err.to_string(), "Stage score cannot follow threshold");
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: RunError = ConfigError::ZeroSplits.into();
        assert_eq!(err.to_string(), "Split-half scoring needs at least one split");
    }
}
