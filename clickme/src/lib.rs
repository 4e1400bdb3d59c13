//! ClickMe - human ceiling estimation for click-based attention maps.
//!
//! Subjects mark the image regions they consider diagnostic. This library
//! turns those clicks into smoothed clickmaps and measures how well subjects
//! agree with each other on the same image (the human ceiling), compared to
//! a null built from maps of images in other categories.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! use clickme::{group_by_image, read_csv, CeilingConfig, CeilingRunner};
//!
//! let rows = read_csv(Path::new("clickme_data.csv"))?;
//! let images = group_by_image(rows, Some("imgs/"));
//!
//! let report = CeilingRunner::run(CeilingConfig::default(), images)?;
//! println!("Ceiling: {:.3}", report.summary.mean_ceiling_full);
//! ```

pub mod agreement;
pub mod ceiling;
pub mod click_parser;
pub(crate) mod common;
pub mod dataset;
pub mod heatmap;
pub mod map_filter;
pub(crate) mod math;
pub mod metric;

#[cfg(test)]
pub mod testing;

// ============================================================================
// Core types
// ============================================================================

pub use click_parser::{parse_clicks, ClickPoint, ParseError, Trial};
pub use common::Buffer2;
pub use heatmap::{
    build_density, center_crop, normalize_min_max, normalize_sum, smooth, Clickmap, Density,
    GaussianKernel, HeatmapBuilder, ImageShape, MapStack,
};

// ============================================================================
// Scoring
// ============================================================================

pub use agreement::{AgreementMode, CategoryComplements, ImageAgreement, SplitHalfConfig};
pub use map_filter::{
    Exclusion, FilterThresholds, FilteredImage, Rejection, TrialCounts, MIN_SCORABLE_SUBJECTS,
};
pub use metric::{Metric, Normalization, SimilarityMetric};

// ============================================================================
// Pipeline
// ============================================================================

pub use ceiling::{
    median_threshold, CeilingConfig, CeilingReport, CeilingRunner, ClickPercentiles, ConfigError,
    Diagnostics, RunError, Stage, Summary,
};
pub use dataset::{group_by_image, read_csv, read_rows, ClickRow, DatasetError, RawImage};
