//! Tracker configuration

use serde::{Deserialize, Serialize};

use crate::TrackerError;

/// Pixel to meter conversion for the top-down view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricScale {
    /// Meters per pixel along the road (image y)
    pub ym_per_pix: f64,

    /// Meters per pixel across the road (image x)
    pub xm_per_pix: f64,
}

impl Default for MetricScale {
    /// 30 m of road over 720 rows, a 3.7 m lane over 700 columns
    fn default() -> Self {
        Self {
            ym_per_pix: 30.0 / 720.0,
            xm_per_pix: 3.7 / 700.0,
        }
    }
}

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Horizontal bands used by the sliding-window search
    pub windows: u32,

    /// Half-width of a search window / localized search band (pixels)
    pub margin: u32,

    /// A window recenters only when it collects more pixels than this
    pub recenter_min_pixels: usize,

    /// Below this many left pixels the relaxed remask is attempted
    pub quality_min_left: usize,

    /// Below this many right pixels the relaxed remask is attempted
    pub quality_min_right: usize,

    /// Both sides need more pixels than this before a fit is accepted
    pub fit_min_pixels: usize,

    /// Radii above this (meters) are reported as a straight lane
    pub straight_radius_m: f64,

    /// Metric conversion
    pub scale: MetricScale,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            windows: 9,
            margin: 100,
            recenter_min_pixels: 50,
            quality_min_left: 300,
            quality_min_right: 100,
            fit_min_pixels: 150,
            straight_radius_m: 100_000.0,
            scale: MetricScale::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.windows == 0 {
            return Err(TrackerError::Config("windows must be at least 1".into()));
        }
        if self.margin == 0 {
            return Err(TrackerError::Config("margin must be positive".into()));
        }
        if self.straight_radius_m.is_nan() || self.straight_radius_m <= 0.0 {
            return Err(TrackerError::Config(format!(
                "straight_radius_m must be positive, got {}",
                self.straight_radius_m
            )));
        }
        let scale_ok = |v: f64| v.is_finite() && v > 0.0;
        if !scale_ok(self.scale.xm_per_pix) || !scale_ok(self.scale.ym_per_pix) {
            return Err(TrackerError::Config(format!(
                "metric scale must be positive, got x={} y={}",
                self.scale.xm_per_pix, self.scale.ym_per_pix
            )));
        }
        Ok(())
    }
}
