//! Lens distortion correction from known camera intrinsics
//!
//! Calibration itself happens offline; this module only applies the result.
//! Undistortion works by inverse mapping: every pixel of the corrected image
//! is projected through the distortion model to find where it was observed
//! in the raw frame, which is then sampled bilinearly.

use image::Rgb;
use imageproc::geometric_transformations::{warp_with, Interpolation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{FrameError, RoadFrame};

/// Brown-Conrady radial-tangential distortion coefficients
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    /// Apply distortion to normalized image coordinates
    pub fn distort_normalized(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let x_tan = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (x * radial + x_tan, y * radial + y_tan)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Pinhole intrinsics plus lens distortion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length x (pixels)
    pub fx: f64,
    /// Focal length y (pixels)
    pub fy: f64,
    /// Principal point x (pixels)
    pub cx: f64,
    /// Principal point y (pixels)
    pub cy: f64,
    #[serde(default)]
    pub distortion: Distortion,
}

impl CameraIntrinsics {
    /// Distortion-free camera centered on a `width` x `height` sensor
    pub fn ideal(focal: f64, width: u32, height: u32) -> Self {
        Self {
            fx: focal,
            fy: focal,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
            distortion: Distortion::default(),
        }
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        if !(self.fx.is_finite() && self.fy.is_finite()) || self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(FrameError::Intrinsics(format!(
                "focal lengths must be positive, got fx={} fy={}",
                self.fx, self.fy
            )));
        }
        if !(self.cx.is_finite() && self.cy.is_finite()) {
            return Err(FrameError::Intrinsics("principal point is not finite".into()));
        }
        Ok(())
    }

    /// Map a pixel of the corrected image to where it appears in the raw frame
    pub fn distort_pixel(&self, u: f64, v: f64) -> (f64, f64) {
        let x = (u - self.cx) / self.fx;
        let y = (v - self.cy) / self.fy;
        let (xd, yd) = self.distortion.distort_normalized(x, y);
        (xd * self.fx + self.cx, yd * self.fy + self.cy)
    }

    /// Remove lens distortion; output keeps the input size and intrinsics
    pub fn undistort(&self, frame: &RoadFrame) -> Result<RoadFrame, FrameError> {
        self.validate()?;
        if self.distortion.is_identity() {
            return Ok(frame.clone());
        }
        debug!(
            width = frame.width,
            height = frame.height,
            k1 = self.distortion.k1,
            "Undistorting frame"
        );
        let camera = *self;
        let raw = frame.to_rgb_image();
        let corrected = warp_with(
            &raw,
            move |u, v| {
                let (x, y) = camera.distort_pixel(u as f64, v as f64);
                (x as f32, y as f32)
            },
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
        );
        Ok(RoadFrame::from_rgb_image(corrected, frame.sequence))
    }
}
