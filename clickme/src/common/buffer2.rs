use std::ops::{Index, IndexMut};

/// Row-major 2D buffer. `(x, y)` indexing addresses column `x` of row `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer2<T> {
    pixels: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2<T> {
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(height, width)`, matching the `[H, W]` convention of image shapes.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn into_pixels(self) -> Vec<T> {
        self.pixels
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }
}

impl<T: Default + Clone> Buffer2<T> {
    pub fn new_default(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![T::default(); width * height],
            width,
            height,
        }
    }
}

impl<T: Clone> Buffer2<T> {
    pub fn new_filled(width: usize, height: usize, value: T) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }

    /// Symmetric center crop to `crop_width` x `crop_height`.
    ///
    /// When the size difference is odd the extra pixel is removed from the
    /// bottom/right edge.
    pub fn center_crop(&self, crop_width: usize, crop_height: usize) -> Self {
        assert!(
            crop_width <= self.width && crop_height <= self.height,
            "crop {}x{} larger than buffer {}x{}",
            crop_width,
            crop_height,
            self.width,
            self.height
        );
        let left = (self.width - crop_width) / 2;
        let top = (self.height - crop_height) / 2;

        let mut pixels = Vec::with_capacity(crop_width * crop_height);
        for y in top..top + crop_height {
            pixels.extend_from_slice(&self.row(y)[left..left + crop_width]);
        }
        Self::new(crop_width, crop_height, pixels)
    }
}

impl Buffer2<f32> {
    /// Sum accumulated in f64.
    pub fn sum(&self) -> f64 {
        self.pixels.iter().map(|&v| v as f64).sum()
    }

    /// `(min, max)` over all pixels, `None` for an empty buffer.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut iter = self.pixels.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    pub fn count_nonzero(&self) -> usize {
        self.pixels.iter().filter(|&&v| v != 0.0).count()
    }

    /// Pixel-wise mean of equally shaped buffers. `None` when `maps` is empty.
    pub fn mean_of<'a>(maps: impl IntoIterator<Item = &'a Buffer2<f32>>) -> Option<Self> {
        let mut iter = maps.into_iter();
        let first = iter.next()?;
        let mut acc: Vec<f64> = first.pixels.iter().map(|&v| v as f64).collect();
        let mut count = 1usize;
        for map in iter {
            assert_eq!(map.shape(), first.shape(), "shape mismatch in mean");
            for (a, &v) in acc.iter_mut().zip(&map.pixels) {
                *a += v as f64;
            }
            count += 1;
        }
        let inv = 1.0 / count as f64;
        Some(Self::new(
            first.width,
            first.height,
            acc.into_iter().map(|v| (v * inv) as f32).collect(),
        ))
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}
