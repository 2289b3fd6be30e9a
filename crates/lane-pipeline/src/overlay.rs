//! Lane overlay rendering

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use lane_tracker::LaneGeometry;
use road_frame::PerspectiveTransform;
use serde::{Deserialize, Serialize};

/// Lane fill style
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Fill colour (RGB)
    pub fill: [u8; 3],
    /// Weight of the fill added on top of the camera image
    pub alpha: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fill: [0, 255, 0],
            alpha: 0.3,
        }
    }
}

/// Fill the area between the lane curves on a blank top-down canvas
pub fn render_lane(geometry: &LaneGeometry, width: u32, height: u32, fill: [u8; 3]) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    let mut points: Vec<Point<i32>> = geometry
        .fill_polygon(height)
        .into_iter()
        .map(|(x, y)| Point::new(x.round() as i32, y.round() as i32))
        .collect();
    points.dedup();
    // draw_polygon_mut rejects an explicitly closed polygon
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() >= 3 {
        draw_polygon_mut(&mut canvas, &points, Rgb(fill));
    }
    canvas
}

/// Saturating `base + alpha * layer`
pub fn blend(base: &RgbImage, layer: &RgbImage, alpha: f32) -> RgbImage {
    let mut out = base.clone();
    for (dst, src) in out.pixels_mut().zip(layer.pixels()) {
        for c in 0..3 {
            let v = dst[c] as f32 + alpha * src[c] as f32;
            dst[c] = v.round().min(255.0) as u8;
        }
    }
    out
}

/// Project the lane area back into the camera view and blend it in
pub fn annotate(
    camera: &RgbImage,
    geometry: &LaneGeometry,
    transform: &PerspectiveTransform,
    style: &OverlayConfig,
) -> RgbImage {
    let (width, height) = camera.dimensions();
    let top_down = render_lane(geometry, width, height, style.fill);
    let projected = transform.inverse(&top_down);
    blend(camera, &projected, style.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_tracker::{Curvature, PolynomialFit};

    fn straight_lane(left: f64, right: f64) -> LaneGeometry {
        LaneGeometry {
            left_fit: PolynomialFit::new(0.0, 0.0, left),
            right_fit: PolynomialFit::new(0.0, 0.0, right),
            lane_width_m: 0.0,
            offset_m: 0.0,
            curvature: Curvature::Straight,
            left_curvature: Curvature::Straight,
            right_curvature: Curvature::Straight,
            left_points: 0,
            right_points: 0,
        }
    }

    #[test]
    fn test_render_fills_between_lines() {
        let canvas = render_lane(&straight_lane(20.0, 60.0), 100, 50, [0, 255, 0]);
        assert_eq!(canvas.get_pixel(40, 25), &Rgb([0, 255, 0]));
        assert_eq!(canvas.get_pixel(5, 25), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(90, 25), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_skips_degenerate_polygon() {
        let canvas = render_lane(&straight_lane(30.0, 30.0), 100, 1, [255, 0, 0]);
        assert!(canvas.pixels().all(|p| p == &Rgb([0, 0, 0])));
    }

    #[test]
    fn test_blend_saturates() {
        let base = RgbImage::from_pixel(2, 1, Rgb([100, 250, 0]));
        let layer = RgbImage::from_pixel(2, 1, Rgb([0, 255, 0]));
        let out = blend(&base, &layer, 0.3);
        assert_eq!(out.get_pixel(0, 0), &Rgb([100, 255, 0]));
    }

    #[test]
    fn test_annotate_identity_warp() {
        let corners = [(0.0, 0.0), (0.0, 50.0), (100.0, 50.0), (100.0, 0.0)];
        let transform = PerspectiveTransform::from_points(corners, corners).unwrap();
        let camera = RgbImage::from_pixel(100, 50, Rgb([50, 50, 50]));
        let out = annotate(&camera, &straight_lane(20.0, 60.0), &transform, &OverlayConfig::default());
        let inside = out.get_pixel(40, 25);
        assert_eq!(inside[0], 50);
        assert!(inside[1] > 100);
        assert_eq!(out.get_pixel(90, 25), &Rgb([50, 50, 50]));
    }
}
