//! Sobel gradient masks

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::config::MaskConfig;

/// Per-pixel Sobel responses for one grayscale image
pub struct GradientField {
    width: u32,
    gx: Vec<f64>,
    gy: Vec<f64>,
}

impl GradientField {
    pub fn compute(gray: &GrayImage) -> Self {
        let gx = horizontal_sobel(gray);
        let gy = vertical_sobel(gray);
        Self {
            width: gray.width(),
            gx: gx.pixels().map(|p| p[0] as f64).collect(),
            gy: gy.pixels().map(|p| p[0] as f64).collect(),
        }
    }

    /// Gradient mask: (|gx| AND |gy| in band) OR (magnitude AND direction in band).
    ///
    /// Absolute and magnitude responses are rescaled so the image maximum is
    /// 255; a flat image produces an empty mask.
    pub fn threshold(&self, config: &MaskConfig) -> Vec<bool> {
        let abs_x: Vec<f64> = self.gx.iter().map(|v| v.abs()).collect();
        let abs_y: Vec<f64> = self.gy.iter().map(|v| v.abs()).collect();
        let mag: Vec<f64> = abs_x
            .iter()
            .zip(&abs_y)
            .map(|(x, y)| (x * x + y * y).sqrt())
            .collect();

        let scale_x = scale_to_u8(&abs_x);
        let scale_y = scale_to_u8(&abs_y);
        let scale_mag = scale_to_u8(&mag);

        (0..self.gx.len())
            .map(|i| {
                let abs_ok = config.abs_thresh.contains((abs_x[i] * scale_x).floor())
                    && config.abs_thresh.contains((abs_y[i] * scale_y).floor());
                let dir = abs_y[i].atan2(abs_x[i]);
                let mag_ok = config.mag_thresh.contains((mag[i] * scale_mag).floor())
                    && config.dir_thresh.contains(dir);
                (abs_ok || mag_ok) && mag[i] > 0.0
            })
            .collect()
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

fn scale_to_u8(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(0.0, f64::max);
    if max > 0.0 {
        255.0 / max
    } else {
        0.0
    }
}
