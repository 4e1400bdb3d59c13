use crate::common::Buffer2;
use crate::heatmap::ImageShape;

/// Per-subject maps of one image, all of one shape: `[subjects, H, W]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStack {
    shape: ImageShape,
    maps: Vec<Buffer2<f32>>,
}

impl MapStack {
    pub fn new(shape: ImageShape, maps: Vec<Buffer2<f32>>) -> Self {
        for map in &maps {
            assert_eq!(
                map.shape(),
                (shape.height, shape.width),
                "stacked map shape mismatch"
            );
        }
        Self { shape, maps }
    }

    /// `[subjects, height, width]`.
    pub fn dims(&self) -> [usize; 3] {
        [self.maps.len(), self.shape.height, self.shape.width]
    }

    pub fn map_shape(&self) -> ImageShape {
        self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    #[inline]
    pub fn get(&self, subject: usize) -> &Buffer2<f32> {
        &self.maps[subject]
    }

    pub fn maps(&self) -> &[Buffer2<f32>] {
        &self.maps
    }

    /// Mean over all subjects. `None` for an empty stack.
    pub fn mean(&self) -> Option<Buffer2<f32>> {
        Buffer2::mean_of(&self.maps)
    }

    /// Mean over the given subjects; repeated indices count repeatedly.
    pub fn mean_of(&self, subjects: &[usize]) -> Option<Buffer2<f32>> {
        Buffer2::mean_of(subjects.iter().map(|&i| &self.maps[i]))
    }

    /// Mean over every subject except `excluded`.
    pub fn mean_excluding(&self, excluded: usize) -> Option<Buffer2<f32>> {
        Buffer2::mean_of(
            self.maps
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != excluded)
                .map(|(_, m)| m),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> MapStack {
        MapStack::new(
            ImageShape::new(1, 2),
            vec![
                Buffer2::new(2, 1, vec![0.0, 3.0]),
                Buffer2::new(2, 1, vec![3.0, 0.0]),
                Buffer2::new(2, 1, vec![6.0, 6.0]),
            ],
        )
    }

    #[test]
    fn test_dims() {
        assert_eq!(stack().dims(), [3, 1, 2]);
    }

    #[test]
    fn test_means() {
        let s = stack();
        assert_eq!(s.mean().unwrap().pixels(), &[3.0, 3.0]);
        assert_eq!(s.mean_of(&[0, 0, 1]).unwrap().pixels(), &[1.0, 2.0]);
        assert_eq!(s.mean_excluding(2).unwrap().pixels(), &[1.5, 1.5]);
        assert!(s.mean_of(&[]).is_none());
    }

    #[test]
    fn test_mean_excluding_single_subject_is_none() {
        let s = MapStack::new(ImageShape::new(1, 1), vec![Buffer2::new(1, 1, vec![1.0])]);
        assert!(s.mean_excluding(0).is_none());
    }

    #[test]
    #[should_panic(expected = "stacked map shape mismatch")]
    fn test_shape_mismatch_panics() {
        MapStack::new(ImageShape::new(2, 2), vec![Buffer2::new(2, 1, vec![0.0, 0.0])]);
    }
}
