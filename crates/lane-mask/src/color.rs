//! Colour-space threshold

use image::RgbImage;

use crate::config::Band;

/// HLS saturation of one RGB pixel, scaled to 0-255
pub fn hls_saturation(rgb: [u8; 3]) -> f64 {
    let r = rgb[0] as f64 / 255.0;
    let g = rgb[1] as f64 / 255.0;
    let b = rgb[2] as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;
    if chroma <= f64::EPSILON {
        return 0.0;
    }
    let lightness = (max + min) / 2.0;
    let s = if lightness < 0.5 {
        chroma / (max + min)
    } else {
        chroma / (2.0 - max - min)
    };
    (s * 255.0).round()
}

/// Pixels whose saturation falls inside `band`
pub fn saturation_mask(image: &RgbImage, band: &Band) -> Vec<bool> {
    image
        .pixels()
        .map(|p| band.contains(hls_saturation(p.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use proptest::prelude::*;

    #[test]
    fn test_gray_has_zero_saturation() {
        assert_eq!(hls_saturation([128, 128, 128]), 0.0);
        assert_eq!(hls_saturation([255, 255, 255]), 0.0);
    }

    #[test]
    fn test_pure_yellow_is_saturated() {
        assert_eq!(hls_saturation([255, 255, 0]), 255.0);
    }

    #[test]
    fn test_mask_picks_yellow_line() {
        let mut img = RgbImage::from_pixel(4, 1, Rgb([90, 90, 90]));
        img.put_pixel(2, 0, Rgb([230, 200, 20]));
        let mask = saturation_mask(&img, &Band::new(170.0, 255.0));
        assert_eq!(mask, vec![false, false, true, false]);
    }

    proptest! {
        #[test]
        fn prop_saturation_in_range_and_channel_order_free(r: u8, g: u8, b: u8) {
            let s = hls_saturation([r, g, b]);
            prop_assert!((0.0..=255.0).contains(&s));
            prop_assert_eq!(s, hls_saturation([b, r, g]));
        }
    }
}
