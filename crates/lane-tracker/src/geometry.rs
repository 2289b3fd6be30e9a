//! Lane geometry from fitted curves

use serde::{Deserialize, Serialize};

use crate::fitter::{MetricFit, PolynomialFit, SideFit};
use crate::TrackerConfig;

/// Radius of curvature, or a perfectly straight line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "meters", rename_all = "snake_case")]
pub enum Curvature {
    Radius(f64),
    Straight,
}

impl Curvature {
    pub fn meters(&self) -> Option<f64> {
        match self {
            Curvature::Radius(r) => Some(*r),
            Curvature::Straight => None,
        }
    }

    pub fn km(&self) -> Option<f64> {
        self.meters().map(|r| r / 1000.0)
    }

    pub fn is_straight(&self) -> bool {
        matches!(self, Curvature::Straight)
    }
}

/// Result of one successful tracking step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneGeometry {
    /// Left boundary, pixel space
    pub left_fit: PolynomialFit,
    /// Right boundary, pixel space
    pub right_fit: PolynomialFit,
    /// Lane width at the vehicle (meters)
    pub lane_width_m: f64,
    /// Lane center minus frame center at the vehicle (meters)
    pub offset_m: f64,
    /// Point-count weighted radius
    pub curvature: Curvature,
    pub left_curvature: Curvature,
    pub right_curvature: Curvature,
    pub left_points: usize,
    pub right_points: usize,
}

impl LaneGeometry {
    /// Closed lane polygon in top-down pixels: left line top to bottom,
    /// then right line bottom to top.
    pub fn fill_polygon(&self, height: u32) -> Vec<(f32, f32)> {
        let left = self.left_fit.sample(height);
        let right = self.right_fit.sample(height);
        left.into_iter()
            .chain(right.into_iter().rev())
            .map(|(x, y)| (x as f32, y as f32))
            .collect()
    }
}

/// Radius of curvature of `x(y)` at `y_m`, both in meters.
///
/// R = (1 + (2ay + b)^2)^1.5 / |2a|. A least-squares fit of a straight line
/// leaves `a` at rounding-noise level rather than zero, so any radius above
/// `straight_above_m` is reported as straight.
pub fn radius_of_curvature(fit: &MetricFit, y_m: f64, straight_above_m: f64) -> Curvature {
    let PolynomialFit { a, b, .. } = fit.0;
    if a == 0.0 {
        return Curvature::Straight;
    }
    let slope = 2.0 * a * y_m + b;
    let radius = (1.0 + slope * slope).powf(1.5) / (2.0 * a).abs();
    if radius.is_finite() && radius <= straight_above_m {
        Curvature::Radius(radius)
    } else {
        Curvature::Straight
    }
}

/// Average of per-side radii weighted by supporting pixel counts.
///
/// Straight sides carry no radius and are left out; if nothing remains the
/// lane is straight.
pub fn weighted_curvature(sides: &[(Curvature, usize)]) -> Curvature {
    let (sum, weight) = sides
        .iter()
        .filter_map(|(c, n)| c.meters().map(|r| (r, *n as f64)))
        .fold((0.0, 0.0), |(s, w), (r, n)| (s + r * n, w + n));
    if weight > 0.0 {
        Curvature::Radius(sum / weight)
    } else {
        Curvature::Straight
    }
}

/// Width, offset and curvature at the bottom row (closest to the vehicle)
pub fn estimate(
    left: &SideFit,
    right: &SideFit,
    frame_height: u32,
    frame_width: u32,
    config: &TrackerConfig,
) -> LaneGeometry {
    let scale = &config.scale;
    let y_bottom = frame_height.saturating_sub(1) as f64;
    let left_x = left.pixel.eval(y_bottom);
    let right_x = right.pixel.eval(y_bottom);

    let width_px = right_x - left_x;
    let center_px = left_x + width_px / 2.0;
    let offset_px = center_px - frame_width as f64 / 2.0;

    let y_m = y_bottom * scale.ym_per_pix;
    let left_curvature = radius_of_curvature(&left.metric, y_m, config.straight_radius_m);
    let right_curvature = radius_of_curvature(&right.metric, y_m, config.straight_radius_m);
    let curvature = weighted_curvature(&[
        (left_curvature, left.points),
        (right_curvature, right.points),
    ]);

    LaneGeometry {
        left_fit: left.pixel,
        right_fit: right.pixel,
        lane_width_m: width_px * scale.xm_per_pix,
        offset_m: offset_px * scale.xm_per_pix,
        curvature,
        left_curvature,
        right_curvature,
        left_points: left.points,
        right_points: right.points,
    }
}
