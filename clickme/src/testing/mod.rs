//! Testing utilities for clickme.

#![allow(dead_code)]

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::click_parser::{ClickPoint, Trial};
use crate::heatmap::{GaussianKernel, HeatmapBuilder, ImageShape, MapStack};

pub const TEST_SHAPE: ImageShape = ImageShape::new(32, 32);

/// Initialize tracing subscriber for tests. Safe to call multiple times.
pub fn init_tracing() {
    common::log_setup::init_test_logging();
}

pub fn test_builder() -> HeatmapBuilder {
    HeatmapBuilder::new(TEST_SHAPE, GaussianKernel::new(5, 5f32.sqrt()), None)
}

/// `clicks` clicks jittered by up to `spread` pixels around `center`.
pub fn jittered_trial(center: ClickPoint, clicks: usize, spread: i32, rng: &mut ChaCha8Rng) -> Trial {
    let points = (0..clicks)
        .map(|_| {
            (
                center.0 + rng.random_range(-spread..=spread),
                center.1 + rng.random_range(-spread..=spread),
            )
        })
        .collect();
    Trial::new(points)
}

/// Stack of `subjects` jittered maps around `center`.
pub fn blob_stack(center: ClickPoint, subjects: usize, seed: u64) -> MapStack {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let builder = test_builder();
    let maps = (0..subjects)
        .map(|_| builder.build(&jittered_trial(center, 6, 3, &mut rng)).map)
        .collect();
    MapStack::new(builder.output_shape(), maps)
}

/// Serialized click string in the ClickMe CSV format.
pub fn click_string(points: &[ClickPoint]) -> String {
    let body = points
        .iter()
        .map(|(x, y)| format!("({},{})", x, y))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{}}}", body)
}
