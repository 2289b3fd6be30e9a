//! Threshold configuration for the lane mask

use serde::{Deserialize, Serialize};

use crate::error::MaskError;

/// Inclusive threshold band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn validate(&self, field: &'static str) -> Result<(), MaskError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(MaskError::InvalidRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Polygon outside of which every pixel is masked off.
///
/// Vertices are fractions of the image width/height so one region fits any
/// resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub vertices: Vec<(f32, f32)>,
}

impl RegionOfInterest {
    /// Road trapezoid for a forward-facing camera view
    pub fn camera_trapezoid() -> Self {
        Self {
            vertices: vec![
                (150.0 / 960.0, 1.0 - 56.0 / 720.0),
                (420.0 / 960.0, 330.0 / 540.0),
                (1.0 - 420.0 / 960.0, 330.0 / 540.0),
                (1.0 - 50.0 / 960.0, 1.0 - 56.0 / 720.0),
            ],
        }
    }

    /// Vertices in pixel coordinates for a `width` x `height` image
    pub fn to_pixels(&self, width: u32, height: u32) -> Vec<(i32, i32)> {
        self.vertices
            .iter()
            .map(|&(fx, fy)| ((fx * width as f32) as i32, (fy * height as f32) as i32))
            .collect()
    }
}

/// Mask configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Per-axis scaled Sobel response (0-255) for the x AND y test
    pub abs_thresh: Band,

    /// Scaled gradient magnitude (0-255)
    pub mag_thresh: Band,

    /// Gradient direction atan2(|gy|, |gx|) in radians
    pub dir_thresh: Band,

    /// HLS saturation (0-255)
    pub sat_thresh: Band,

    /// Optional polygon restricting the output
    pub region: Option<RegionOfInterest>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            abs_thresh: Band::new(50.0, 200.0),
            mag_thresh: Band::new(80.0, 200.0),
            dir_thresh: Band::new(0.7, 1.3),
            sat_thresh: Band::new(170.0, 255.0),
            region: None,
        }
    }
}

impl MaskConfig {
    /// Widened thresholds for frames with faint markings
    pub fn relaxed() -> Self {
        Self {
            abs_thresh: Band::new(30.0, 255.0),
            mag_thresh: Band::new(50.0, 255.0),
            dir_thresh: Band::new(0.5, 1.5),
            sat_thresh: Band::new(120.0, 255.0),
            region: None,
        }
    }

    /// Same thresholds, clipped to a region
    pub fn with_region(mut self, region: RegionOfInterest) -> Self {
        self.region = Some(region);
        self
    }

    pub fn validate(&self) -> Result<(), MaskError> {
        self.abs_thresh.validate("abs")?;
        self.mag_thresh.validate("magnitude")?;
        self.dir_thresh.validate("direction")?;
        self.sat_thresh.validate("saturation")?;
        if let Some(region) = &self.region {
            if region.vertices.len() < 3 {
                return Err(MaskError::InvalidRegion(region.vertices.len()));
            }
        }
        Ok(())
    }
}
