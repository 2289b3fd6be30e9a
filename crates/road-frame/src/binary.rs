//! Binary bird's-eye frames

use image::{GrayImage, Luma};
use ndarray::{s, Array2, Axis};

/// Top-down frame where each pixel is either a lane-marking candidate or not.
///
/// Stored row-major as `[[y, x]]`; any non-zero cell counts as "on".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFrame {
    data: Array2<u8>,
}

impl BinaryFrame {
    /// All-off frame
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: Array2::zeros((height as usize, width as usize)),
        }
    }

    /// Build a frame by evaluating `on(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, on: impl Fn(u32, u32) -> bool) -> Self {
        let data = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            on(x as u32, y as u32) as u8
        });
        Self { data }
    }

    /// Threshold a mask image: non-zero luma is "on"
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_fn(width, height, |x, y| image.get_pixel(x, y)[0] != 0)
    }

    /// Render as a black/white image
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            if self.is_on(x, y) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    pub fn width(&self) -> u32 {
        self.data.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.data.nrows() as u32
    }

    /// Frame size as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Whether (x, y) is on; out-of-bounds reads as off
    pub fn is_on(&self, x: u32, y: u32) -> bool {
        self.data
            .get((y as usize, x as usize))
            .map_or(false, |&v| v != 0)
    }

    /// Set (x, y); out-of-bounds writes are ignored
    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        if let Some(v) = self.data.get_mut((y as usize, x as usize)) {
            *v = on as u8;
        }
    }

    /// Number of on pixels
    pub fn count_on(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// On pixels as (x, y), in row-major order
    pub fn on_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.data
            .indexed_iter()
            .filter(|(_, &v)| v != 0)
            .map(|((y, x), _)| (x as u32, y as u32))
    }

    /// Number of on pixels per column over rows `from_row..height`
    pub fn column_histogram(&self, from_row: u32) -> Vec<u32> {
        let from = (from_row as usize).min(self.data.nrows());
        self.data
            .slice(s![from.., ..])
            .map(|&v| (v != 0) as u32)
            .sum_axis(Axis(0))
            .to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_histogram_counts_bottom_half_only() {
        let frame = BinaryFrame::from_fn(4, 4, |x, _| x == 1);
        let mut top_only = frame.clone();
        top_only.set(3, 0, true);

        assert_eq!(frame.column_histogram(2), vec![0, 2, 0, 0]);
        assert_eq!(top_only.column_histogram(2), vec![0, 2, 0, 0]);
        assert_eq!(top_only.column_histogram(0), vec![0, 4, 0, 1]);
    }

    #[test]
    fn test_on_pixels_row_major() {
        let mut frame = BinaryFrame::new(3, 2);
        frame.set(2, 0, true);
        frame.set(0, 1, true);
        let pixels: Vec<_> = frame.on_pixels().collect();
        assert_eq!(pixels, vec![(2, 0), (0, 1)]);
        assert_eq!(frame.count_on(), 2);
    }

    #[test]
    fn test_out_of_bounds_is_off() {
        let mut frame = BinaryFrame::new(2, 2);
        frame.set(5, 5, true);
        assert!(!frame.is_on(5, 5));
        assert_eq!(frame.count_on(), 0);
    }

    #[test]
    fn test_gray_conversion() {
        let mut gray = GrayImage::new(2, 2);
        gray.put_pixel(1, 1, Luma([17]));
        let frame = BinaryFrame::from_gray(&gray);
        assert!(frame.is_on(1, 1));
        assert_eq!(frame.to_gray().get_pixel(1, 1)[0], 255);
        assert_eq!(frame.to_gray().get_pixel(0, 0)[0], 0);
    }

    proptest! {
        #[test]
        fn prop_histogram_totals_match_on_pixels(
            width in 1u32..40,
            height in 1u32..40,
            seed in any::<u64>(),
        ) {
            let frame = BinaryFrame::from_fn(width, height, |x, y| {
                (seed >> ((x * 7 + y * 13) % 64)) & 1 == 1
            });
            let total: u32 = frame.column_histogram(0).iter().sum();
            prop_assert_eq!(total as usize, frame.count_on());
            prop_assert_eq!(frame.on_pixels().count(), frame.count_on());
            let lower: u32 = frame.column_histogram(height / 2).iter().sum();
            let expected = frame.on_pixels().filter(|&(_, y)| y >= height / 2).count();
            prop_assert_eq!(lower as usize, expected);
        }
    }
}
