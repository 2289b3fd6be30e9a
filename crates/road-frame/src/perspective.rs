//! Bird's-eye perspective transform
//!
//! A four-point homography maps a trapezoid on the road surface onto a
//! rectangle, producing a top-down view in which lane lines are roughly
//! vertical. The inverse transform warps drawings made in top-down space
//! back into the camera view.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::FrameError;

/// Control points for the bird's-eye warp (pixel coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveConfig {
    /// Road trapezoid in the camera view
    pub src: [(f32, f32); 4],
    /// Where each source point lands in the top-down view
    pub dst: [(f32, f32); 4],
}

impl Default for PerspectiveConfig {
    /// Points for a 1280x720 dash camera looking down a straight lane
    fn default() -> Self {
        Self {
            src: [(585.0, 460.0), (203.0, 720.0), (1127.0, 720.0), (695.0, 460.0)],
            dst: [(320.0, 0.0), (320.0, 720.0), (960.0, 720.0), (960.0, 0.0)],
        }
    }
}

impl PerspectiveConfig {
    /// Scale the control points to a frame of a different size
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        let scale = |pts: [(f32, f32); 4]| pts.map(|(x, y)| (x * sx, y * sy));
        Self {
            src: scale(self.src),
            dst: scale(self.dst),
        }
    }
}

/// Forward and inverse bird's-eye projection
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveTransform {
    forward: Projection,
    inverse: Projection,
}

impl PerspectiveTransform {
    /// Build from explicit point correspondences
    pub fn from_points(src: [(f32, f32); 4], dst: [(f32, f32); 4]) -> Result<Self, FrameError> {
        let forward =
            Projection::from_control_points(src, dst).ok_or(FrameError::DegenerateProjection)?;
        let inverse =
            Projection::from_control_points(dst, src).ok_or(FrameError::DegenerateProjection)?;
        Ok(Self { forward, inverse })
    }

    pub fn from_config(config: &PerspectiveConfig) -> Result<Self, FrameError> {
        Self::from_points(config.src, config.dst)
    }

    /// Camera view to top-down view
    pub fn forward(&self, image: &RgbImage) -> RgbImage {
        debug!(width = image.width(), height = image.height(), "Warping to top-down view");
        warp(image, &self.forward, Interpolation::Bilinear, Rgb([0, 0, 0]))
    }

    /// Top-down view back to camera view
    pub fn inverse(&self, image: &RgbImage) -> RgbImage {
        warp(image, &self.inverse, Interpolation::Bilinear, Rgb([0, 0, 0]))
    }

    /// Map a single camera-view point into the top-down view
    pub fn forward_point(&self, point: (f32, f32)) -> (f32, f32) {
        self.forward * point
    }

    /// Map a single top-down point back into the camera view
    pub fn inverse_point(&self, point: (f32, f32)) -> (f32, f32) {
        self.inverse * point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 0.5 && (a.1 - b.1).abs() < 0.5
    }

    #[test]
    fn test_control_points_map_exactly() {
        let config = PerspectiveConfig::default();
        let t = PerspectiveTransform::from_config(&config).unwrap();
        for (s, d) in config.src.iter().zip(config.dst.iter()) {
            assert!(close(t.forward_point(*s), *d));
            assert!(close(t.inverse_point(*d), *s));
        }
    }

    #[test]
    fn test_identity_warp_keeps_pixels() {
        let pts = [(0.0, 0.0), (0.0, 9.0), (9.0, 9.0), (9.0, 0.0)];
        let t = PerspectiveTransform::from_points(pts, pts).unwrap();
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(4, 5, Rgb([255, 0, 0]));
        let out = t.forward(&img);
        assert_eq!(out.dimensions(), (10, 10));
        assert!(out.get_pixel(4, 5)[0] > 200);
    }

    #[test]
    fn test_scaled_config() {
        let half = PerspectiveConfig::default().scaled(0.5, 0.5);
        assert_eq!(half.dst[1], (160.0, 360.0));
    }
}
