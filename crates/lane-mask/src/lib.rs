//! Lane Candidate Masking
//!
//! Turns a top-down RGB road image into a `BinaryFrame` of lane-marking
//! candidates by combining Sobel gradient tests with an HLS saturation test.
//! All thresholds come from a single `MaskConfig`; the tracker's faint-marking
//! fallback simply re-runs the mask with `MaskConfig::relaxed()`.

mod color;
mod config;
mod error;
mod gradient;

pub use color::{hls_saturation, saturation_mask};
pub use config::{Band, MaskConfig, RegionOfInterest};
pub use error::MaskError;
pub use gradient::GradientField;

use image::{GrayImage, Luma, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use road_frame::BinaryFrame;
use tracing::debug;

/// Produces binary lane-candidate frames from top-down images
pub trait MaskProvider {
    fn mask(&self, top_down: &RgbImage, config: &MaskConfig) -> Result<BinaryFrame, MaskError>;
}

/// Gradient + saturation threshold mask
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdMasker;

impl MaskProvider for ThresholdMasker {
    fn mask(&self, top_down: &RgbImage, config: &MaskConfig) -> Result<BinaryFrame, MaskError> {
        config.validate()?;
        let (width, height) = top_down.dimensions();
        if width == 0 || height == 0 {
            return Err(MaskError::EmptyImage);
        }

        let gray = image::imageops::grayscale(top_down);
        let gradient = GradientField::compute(&gray).threshold(config);
        let color = saturation_mask(top_down, &config.sat_thresh);
        let region = config
            .region
            .as_ref()
            .map(|r| region_mask(r, width, height));

        let frame = BinaryFrame::from_fn(width, height, |x, y| {
            let i = (y * width + x) as usize;
            let inside = region
                .as_ref()
                .map_or(true, |m| m.get_pixel(x, y)[0] != 0);
            inside && (gradient[i] || color[i])
        });

        debug!(
            width,
            height,
            on_pixels = frame.count_on(),
            "Lane mask computed"
        );
        Ok(frame)
    }
}

/// Rasterize a region of interest as a 0/255 image
fn region_mask(region: &RegionOfInterest, width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let mut points: Vec<Point<i32>> = region
        .to_pixels(width, height)
        .into_iter()
        .map(|(x, y)| Point::new(x, y))
        .collect();
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() >= 3 {
        draw_polygon_mut(&mut mask, &points, Luma([255]));
    }
    mask
}
