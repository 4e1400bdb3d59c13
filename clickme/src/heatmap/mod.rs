//! Clickmap construction: click scattering, Gaussian smoothing, cropping and
//! per-map normalization.
//!
//! Smoothing is a "same"-size convolution with zero padding. The isotropic
//! Gaussian is applied as two 1D passes (rows, then columns), which equals
//! the full 2D kernel because the normalized 2D kernel is the outer product
//! of the normalized 1D kernel with itself. Mass near the border leaks into
//! the padding; mass of clicks at least `radius` pixels from every edge is
//! preserved.


mod stack;

pub use stack::MapStack;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::click_parser::{ClickPoint, Trial};
use crate::common::Buffer2;

/// Rows processed per rayon task during convolution.
const ROWS_PER_CHUNK: usize = 8;

/// Map shape as `[height, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct ImageShape {
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn fits_within(&self, other: &ImageShape) -> bool {
        self.height <= other.height && self.width <= other.width
    }
}

impl From<[usize; 2]> for ImageShape {
    fn from([height, width]: [usize; 2]) -> Self {
        Self { height, width }
    }
}

impl From<ImageShape> for [usize; 2] {
    fn from(shape: ImageShape) -> Self {
        [shape.height, shape.width]
    }
}

/// Normalized, symmetric Gaussian kernel of odd size.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    size: usize,
    sigma: f32,
    weights: Vec<f32>,
}

impl GaussianKernel {
    /// Builds a kernel with `size` taps (odd, > 0) and standard deviation
    /// `sigma` (> 0). Weights sum to 1.
    pub fn new(size: usize, sigma: f32) -> Self {
        assert!(size % 2 == 1, "Kernel size must be odd, got {}", size);
        assert!(sigma > 0.0, "Sigma must be positive");

        let radius = (size / 2) as f64;
        let two_sigma_sq = 2.0 * sigma as f64 * sigma as f64;
        let raw: Vec<f64> = (0..size)
            .map(|i| {
                let x = i as f64 - radius;
                (-x * x / two_sigma_sq).exp()
            })
            .collect();
        let sum: f64 = raw.iter().sum();

        Self {
            size,
            sigma,
            weights: raw.iter().map(|&v| (v / sum) as f32).collect(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn radius(&self) -> usize {
        self.size / 2
    }

    #[inline]
    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// 1D weights.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Full 2D kernel, `size` x `size`.
    pub fn to_2d(&self) -> Buffer2<f32> {
        let mut kernel = Buffer2::new_default(self.size, self.size);
        for (ky, &wy) in self.weights.iter().enumerate() {
            for (kx, &wx) in self.weights.iter().enumerate() {
                kernel[(kx, ky)] = wy * wx;
            }
        }
        kernel
    }
}

/// Click counts scattered onto a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Density {
    pub grid: Buffer2<f32>,
    /// Clicks that fell outside the grid and were not counted.
    pub dropped: usize,
}

/// Accumulates one count per click at row `y`, column `x`.
///
/// Out-of-bounds clicks are dropped and counted in [`Density::dropped`].
pub fn build_density(points: &[ClickPoint], shape: ImageShape) -> Density {
    let mut grid = Buffer2::new_default(shape.width, shape.height);
    let mut dropped = 0;
    for &(x, y) in points {
        if x < 0 || y < 0 || x as usize >= shape.width || y as usize >= shape.height {
            dropped += 1;
            continue;
        }
        grid[(x as usize, y as usize)] += 1.0;
    }
    Density { grid, dropped }
}

/// Same-size convolution with `kernel`, zero padded.
pub fn smooth(grid: &Buffer2<f32>, kernel: &GaussianKernel) -> Buffer2<f32> {
    let width = grid.width();
    let height = grid.height();
    if grid.is_empty() {
        return grid.clone();
    }

    let mut temp = vec![0.0f32; width * height];
    convolve_rows_parallel(grid.pixels(), &mut temp, width, kernel.weights());

    let mut output = vec![0.0f32; width * height];
    convolve_cols_parallel(&temp, &mut output, width, height, kernel.weights());

    Buffer2::new(width, height, output)
}

fn convolve_rows_parallel(input: &[f32], output: &mut [f32], width: usize, kernel: &[f32]) {
    output
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, out_chunk)| {
            let y_start = chunk_idx * ROWS_PER_CHUNK;
            let rows_in_chunk = out_chunk.len() / width;

            for local_y in 0..rows_in_chunk {
                let y = y_start + local_y;
                let in_row = &input[y * width..(y + 1) * width];
                let out_row = &mut out_chunk[local_y * width..(local_y + 1) * width];
                convolve_row(in_row, out_row, kernel);
            }
        });
}

#[inline]
fn convolve_row(input: &[f32], output: &mut [f32], kernel: &[f32]) {
    let radius = kernel.len() / 2;
    let width = input.len() as isize;
    for (x, out) in output.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        for (k, &kval) in kernel.iter().enumerate() {
            let sx = x as isize + k as isize - radius as isize;
            if sx >= 0 && sx < width {
                sum += input[sx as usize] * kval;
            }
        }
        *out = sum;
    }
}

fn convolve_cols_parallel(
    input: &[f32],
    output: &mut [f32],
    width: usize,
    height: usize,
    kernel: &[f32],
) {
    let radius = kernel.len() / 2;

    output
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, out_chunk)| {
            let y_start = chunk_idx * ROWS_PER_CHUNK;
            let rows_in_chunk = out_chunk.len() / width;

            for local_y in 0..rows_in_chunk {
                let y = y_start + local_y;
                let out_row = &mut out_chunk[local_y * width..(local_y + 1) * width];

                for (k, &kval) in kernel.iter().enumerate() {
                    let sy = y as isize + k as isize - radius as isize;
                    if sy < 0 || sy >= height as isize {
                        continue;
                    }
                    let in_row = &input[sy as usize * width..(sy as usize + 1) * width];
                    for (out, &v) in out_row.iter_mut().zip(in_row) {
                        *out += v * kval;
                    }
                }
            }
        });
}

/// Symmetric center crop, no resampling.
pub fn center_crop(grid: &Buffer2<f32>, crop: ImageShape) -> Buffer2<f32> {
    grid.center_crop(crop.width, crop.height)
}

/// Rescales so the map sums to 1. `None` when the sum is zero or not finite.
pub fn normalize_sum(map: &Buffer2<f32>) -> Option<Buffer2<f32>> {
    let sum = map.sum();
    if sum == 0.0 || !sum.is_finite() {
        return None;
    }
    let inv = 1.0 / sum;
    let pixels = map.pixels().iter().map(|&v| (v as f64 * inv) as f32).collect();
    Some(Buffer2::new(map.width(), map.height(), pixels))
}

/// Rescales to `[0, 1]`. `None` when the map is constant or empty.
pub fn normalize_min_max(map: &Buffer2<f32>) -> Option<Buffer2<f32>> {
    let (lo, hi) = map.min_max()?;
    let range = hi as f64 - lo as f64;
    if range == 0.0 || !range.is_finite() {
        return None;
    }
    let inv = 1.0 / range;
    let pixels = map
        .pixels()
        .iter()
        .map(|&v| ((v as f64 - lo as f64) * inv) as f32)
        .collect();
    Some(Buffer2::new(map.width(), map.height(), pixels))
}

/// A smoothed single-trial map plus scatter diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Clickmap {
    pub map: Buffer2<f32>,
    pub dropped_points: usize,
}

/// Turns trials into smoothed, optionally cropped clickmaps.
#[derive(Debug, Clone)]
pub struct HeatmapBuilder {
    shape: ImageShape,
    kernel: GaussianKernel,
    center_crop: Option<ImageShape>,
}

impl HeatmapBuilder {
    pub fn new(shape: ImageShape, kernel: GaussianKernel, center_crop: Option<ImageShape>) -> Self {
        if let Some(crop) = center_crop {
            assert!(
                crop.fits_within(&shape),
                "center crop {:?} exceeds image shape {:?}",
                crop,
                shape
            );
        }
        Self {
            shape,
            kernel,
            center_crop,
        }
    }

    pub fn kernel(&self) -> &GaussianKernel {
        &self.kernel
    }

    /// Shape of the maps this builder produces.
    pub fn output_shape(&self) -> ImageShape {
        self.center_crop.unwrap_or(self.shape)
    }

    pub fn build(&self, trial: &Trial) -> Clickmap {
        let density = build_density(trial.points(), self.shape);
        let smoothed = smooth(&density.grid, &self.kernel);
        let map = match self.center_crop {
            Some(crop) => center_crop(&smoothed, crop),
            None => smoothed,
        };
        Clickmap {
            map,
            dropped_points: density.dropped,
        }
    }
}
