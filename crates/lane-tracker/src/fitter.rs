//! Quadratic lane curve fitting
//!
//! Lane lines run roughly vertically in the top-down view, so x is fitted as
//! a function of y: `x = a*y^2 + b*y + c`. The least-squares normal
//! equations are solved on y rescaled to [0, 1] and the coefficients mapped
//! back, which keeps the 3x3 system well conditioned for 720-row frames.

use serde::{Deserialize, Serialize};

use crate::locator::PixelSet;
use crate::{FitError, MetricScale};

/// Distinct rows needed for a non-degenerate quadratic
pub const MIN_DISTINCT_ROWS: usize = 3;

/// x = a*y^2 + b*y + c in pixel units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolynomialFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl PolynomialFit {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    #[inline]
    pub fn eval(&self, y: f64) -> f64 {
        self.a * y * y + self.b * y + self.c
    }

    /// dx/dy at y
    #[inline]
    pub fn slope(&self, y: f64) -> f64 {
        2.0 * self.a * y + self.b
    }

    /// (x, y) for every row of a frame `height` rows tall
    pub fn sample(&self, height: u32) -> Vec<(f64, f64)> {
        (0..height)
            .map(|y| (self.eval(y as f64), y as f64))
            .collect()
    }
}

/// Same polynomial form fitted on coordinates in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricFit(pub PolynomialFit);

/// Pixel and metric fits for one lane side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideFit {
    pub pixel: PolynomialFit,
    pub metric: MetricFit,
    /// Pixels the fit was made from
    pub points: usize,
}

/// Least-squares quadratic through `(x, y)` samples
pub fn fit_points(points: &[(f64, f64)]) -> Result<PolynomialFit, FitError> {
    let mut rows: Vec<f64> = points.iter().map(|p| p.1).collect();
    rows.sort_by(|a, b| a.total_cmp(b));
    rows.dedup();
    if rows.len() < MIN_DISTINCT_ROWS {
        return Err(FitError::InsufficientPoints {
            points: points.len(),
            distinct_rows: rows.len(),
        });
    }

    let y_min = rows[0];
    let y_range = rows[rows.len() - 1] - y_min;

    let n = points.len() as f64;
    let (mut s1, mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0, 0.0);
    let (mut sx0, mut sx1, mut sx2) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        let t = (y - y_min) / y_range;
        let t2 = t * t;
        s1 += t;
        s2 += t2;
        s3 += t2 * t;
        s4 += t2 * t2;
        sx0 += x;
        sx1 += x * t;
        sx2 += x * t2;
    }

    //   | s4 s3 s2 | | a |   | sx2 |
    //   | s3 s2 s1 | | b | = | sx1 |
    //   | s2 s1 n  | | c |   | sx0 |
    let (an, bn, cn) = solve_3x3([s4, s3, s2, s3, s2, s1, s2, s1, n], [sx2, sx1, sx0]).ok_or(
        FitError::InsufficientPoints {
            points: points.len(),
            distinct_rows: rows.len(),
        },
    )?;

    // Substitute t = (y - m) / r back into the normalized polynomial.
    let (m, r) = (y_min, y_range);
    let a = an / (r * r);
    let b = bn / r - 2.0 * an * m / (r * r);
    let c = an * m * m / (r * r) - bn * m / r + cn;
    Ok(PolynomialFit { a, b, c })
}

/// Pixel-space fit of a candidate set
pub fn fit_pixels(set: &PixelSet) -> Result<PolynomialFit, FitError> {
    let points: Vec<(f64, f64)> = set.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    fit_points(&points)
}

/// Refit after scaling both axes to meters
pub fn fit_metric(set: &PixelSet, scale: &MetricScale) -> Result<MetricFit, FitError> {
    let points: Vec<(f64, f64)> = set
        .iter()
        .map(|p| (p.x as f64 * scale.xm_per_pix, p.y as f64 * scale.ym_per_pix))
        .collect();
    fit_points(&points).map(MetricFit)
}

/// Fit one side in both spaces
pub fn fit_side(set: &PixelSet, scale: &MetricScale) -> Result<SideFit, FitError> {
    Ok(SideFit {
        pixel: fit_pixels(set)?,
        metric: fit_metric(set, scale)?,
        points: set.len(),
    })
}

/// Solve a 3x3 system by Gaussian elimination with partial pivoting.
/// Row-major matrix; `None` when singular.
fn solve_3x3(mat: [f64; 9], rhs: [f64; 3]) -> Option<(f64, f64, f64)> {
    let mut m = [
        [mat[0], mat[1], mat[2], rhs[0]],
        [mat[3], mat[4], mat[5], rhs[1]],
        [mat[6], mat[7], mat[8], rhs[2]],
    ];

    for col in 0..3 {
        let pivot = (col..3)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        for row in (col + 1)..3 {
            let factor = m[row][col] / m[col][col];
            for j in col..4 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let c = m[2][3] / m[2][2];
    let b = (m[1][3] - m[1][2] * c) / m[1][1];
    let a = (m[0][3] - m[0][2] * c - m[0][1] * b) / m[0][0];

    if a.is_finite() && b.is_finite() && c.is_finite() {
        Some((a, b, c))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn samples(fit: PolynomialFit, rows: impl Iterator<Item = u32>) -> Vec<(f64, f64)> {
        rows.map(|y| (fit.eval(y as f64), y as f64)).collect()
    }

    fn close(got: f64, want: f64) -> bool {
        (got - want).abs() <= 1e-6 * want.abs().max(1e-3)
    }

    #[test]
    fn test_solve_3x3_identity() {
        let (a, b, c) = solve_3x3(
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            [1.0, 2.0, 3.0],
        )
        .unwrap();
        assert!((a - 1.0).abs() < 1e-12);
        assert!((b - 2.0).abs() < 1e-12);
        assert!((c - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_3x3_singular() {
        let result = solve_3x3(
            [1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            [1.0, 1.0, 2.0],
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_exact_quadratic_recovered() {
        let truth = PolynomialFit::new(2.5e-4, -0.31, 412.0);
        let fit = fit_points(&samples(truth, 0..720)).unwrap();
        assert!(close(fit.a, truth.a), "a = {}", fit.a);
        assert!(close(fit.b, truth.b), "b = {}", fit.b);
        assert!(close(fit.c, truth.c), "c = {}", fit.c);
    }

    #[test]
    fn test_vertical_line_is_flat() {
        let set: PixelSet = (0..720).map(|y| (300, y)).collect();
        let fit = fit_pixels(&set).unwrap();
        assert!(fit.a.abs() < 1e-9);
        assert!(fit.b.abs() < 1e-6);
        assert!((fit.c - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_least_squares_averages_thick_line() {
        // Columns 300..=309 on every row: best constant is 304.5
        let set: PixelSet = (0..100)
            .flat_map(|y| (300..310).map(move |x| (x, y)))
            .collect();
        let fit = fit_pixels(&set).unwrap();
        assert!((fit.eval(50.0) - 304.5).abs() < 1e-6);
    }

    #[test]
    fn test_two_rows_is_insufficient() {
        let set: PixelSet = [(10, 5), (12, 5), (11, 6)].into_iter().collect();
        assert_eq!(
            fit_pixels(&set),
            Err(FitError::InsufficientPoints {
                points: 3,
                distinct_rows: 2
            })
        );
        assert!(fit_pixels(&PixelSet::new()).is_err());
    }

    #[test]
    fn test_metric_fit_matches_scaled_pixel_fit() {
        let scale = MetricScale::default();
        let truth = PolynomialFit::new(4e-4, -0.2, 350.0);
        let set: PixelSet = (0..720)
            .map(|y| (truth.eval(y as f64).round() as u32, y))
            .collect();
        let side = fit_side(&set, &scale).unwrap();
        // x_m = xm * (a (y_m / ym)^2 + ...), so a_m = a * xm / ym^2
        let expected_a = side.pixel.a * scale.xm_per_pix / (scale.ym_per_pix * scale.ym_per_pix);
        assert!(close(side.metric.0.a, expected_a));
        assert_eq!(side.points, 720);
    }

    #[test]
    fn test_sample_covers_every_row() {
        let fit = PolynomialFit::new(0.0, 1.0, 0.0);
        let pts = fit.sample(4);
        assert_eq!(pts, vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(fit.slope(10.0), 1.0);
    }

    proptest! {
        #[test]
        fn prop_noise_free_roundtrip(
            a in -1e-3f64..1e-3,
            b in -1.0f64..1.0,
            c in 0.0f64..1280.0,
            start in 0u32..300,
            len in 10u32..420,
        ) {
            let truth = PolynomialFit::new(a, b, c);
            let pts = samples(truth, start..start + len);
            let fit = fit_points(&pts).unwrap();

            // Each term is compared at its largest contribution over the span.
            let y_max = (start + len - 1) as f64;
            let x_scale = pts.iter().map(|p| p.0.abs()).fold(1.0, f64::max);
            let tol = 1e-6 * x_scale;
            prop_assert!((fit.a - a).abs() * y_max * y_max <= tol, "a {} vs {}", fit.a, a);
            prop_assert!((fit.b - b).abs() * y_max <= tol, "b {} vs {}", fit.b, b);
            prop_assert!((fit.c - c).abs() <= tol, "c {} vs {}", fit.c, c);
        }
    }
}
