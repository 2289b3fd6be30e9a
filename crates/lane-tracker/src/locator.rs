//! Lane pixel candidate search
//!
//! Two strategies over a binary top-down frame:
//!
//! - **Blind search**: find the lane bases from a column histogram of the
//!   lower half of the frame, then follow each line upward through a stack of
//!   horizontal windows, recentering a window whenever it collects enough
//!   pixels.
//! - **Localized search**: keep every on pixel that lies within a margin of
//!   the previous frame's fitted curves. Fails when either side comes back
//!   empty so the caller can fall back to blind search.

use std::fmt;

use road_frame::BinaryFrame;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::LanePair;
use crate::{SearchError, TrackerConfig};

/// Lane side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Pixel coordinate in the top-down frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
}

/// Candidate pixels for one lane line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelSet {
    pixels: Vec<Pixel>,
}

impl PixelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: u32, y: u32) {
        self.pixels.push(Pixel { x, y });
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pixel> + '_ {
        self.pixels.iter()
    }

}

impl FromIterator<(u32, u32)> for PixelSet {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        Self {
            pixels: iter.into_iter().map(|(x, y)| Pixel { x, y }).collect(),
        }
    }
}

/// Left and right candidate sets for one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneCandidates {
    pub left: PixelSet,
    pub right: PixelSet,
}

impl LaneCandidates {
    /// (left, right) pixel counts
    pub fn counts(&self) -> (usize, usize) {
        (self.left.len(), self.right.len())
    }
}

/// One window visited by the blind search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub side: Side,
    /// Inclusive left edge, may lie outside the frame
    pub x_lo: i64,
    /// Exclusive right edge, may lie outside the frame
    pub x_hi: i64,
    pub y_lo: u32,
    pub y_hi: u32,
    pub hits: usize,
}

/// What the blind search saw, for debugging and overlays
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlindSearchTrace {
    pub left_base: u32,
    pub right_base: u32,
    pub windows: Vec<SearchWindow>,
}

impl BlindSearchTrace {
    /// Per-window hit counts for one side, bottom window first
    pub fn hits(&self, side: Side) -> Vec<usize> {
        self.windows
            .iter()
            .filter(|w| w.side == side)
            .map(|w| w.hits)
            .collect()
    }
}

/// Index of the first maximum, 0 for an empty slice
fn argmax(values: &[u32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Collect on pixels in `[x_lo, x_hi) x [y_lo, y_hi)`, clipped to the frame
fn collect_window(
    frame: &BinaryFrame,
    x_lo: i64,
    x_hi: i64,
    y_lo: u32,
    y_hi: u32,
    out: &mut PixelSet,
) -> (usize, u64) {
    let x_start = x_lo.max(0) as u32;
    let x_end = x_hi.clamp(0, frame.width() as i64) as u32;
    let mut hits = 0usize;
    let mut sum_x = 0u64;
    for y in y_lo..y_hi {
        for x in x_start..x_end {
            if frame.is_on(x, y) {
                out.push(x, y);
                hits += 1;
                sum_x += x as u64;
            }
        }
    }
    (hits, sum_x)
}

/// Sliding-window histogram search
pub fn blind_search(frame: &BinaryFrame, config: &TrackerConfig) -> (LaneCandidates, BlindSearchTrace) {
    let (width, height) = frame.dimensions();
    let histogram = frame.column_histogram(height / 2);
    let midpoint = (width / 2) as usize;
    let left_base = argmax(&histogram[..midpoint]);
    let right_base = argmax(&histogram[midpoint..]) + midpoint;

    let mut candidates = LaneCandidates::default();
    let mut trace = BlindSearchTrace {
        left_base: left_base as u32,
        right_base: right_base as u32,
        windows: Vec::new(),
    };

    let window_height = height / config.windows;
    if window_height == 0 {
        debug!(height, windows = config.windows, "Frame too short for the search windows");
        return (candidates, trace);
    }
    let margin = config.margin as i64;
    let mut centers = [left_base as i64, right_base as i64];
    trace.windows.reserve(2 * config.windows as usize);

    for window in 0..config.windows {
        let y_hi = height - window * window_height;
        let y_lo = y_hi - window_height;

        for (side, center) in [Side::Left, Side::Right].into_iter().zip(centers.iter_mut()) {
            let out = match side {
                Side::Left => &mut candidates.left,
                Side::Right => &mut candidates.right,
            };
            let (x_lo, x_hi) = (*center - margin, *center + margin);
            let (hits, sum_x) = collect_window(frame, x_lo, x_hi, y_lo, y_hi, out);
            trace.windows.push(SearchWindow {
                side,
                x_lo,
                x_hi,
                y_lo,
                y_hi,
                hits,
            });
            if hits > config.recenter_min_pixels {
                *center = (sum_x / hits as u64) as i64;
            }
        }
    }

    debug!(
        left_base,
        right_base,
        left = candidates.left.len(),
        right = candidates.right.len(),
        "Blind search complete"
    );
    (candidates, trace)
}

/// Margin search around the previous fits
pub fn localized_search(
    frame: &BinaryFrame,
    prior: &LanePair,
    margin: u32,
) -> Result<LaneCandidates, SearchError> {
    let margin = margin as f64;
    let mut candidates = LaneCandidates::default();

    for (x, y) in frame.on_pixels() {
        let (xf, yf) = (x as f64, y as f64);
        let left_x = prior.left.eval(yf);
        if xf > left_x - margin && xf < left_x + margin {
            candidates.left.push(x, y);
        }
        let right_x = prior.right.eval(yf);
        if xf > right_x - margin && xf < right_x + margin {
            candidates.right.push(x, y);
        }
    }

    if candidates.left.is_empty() {
        return Err(SearchError::TrackingLost(Side::Left));
    }
    if candidates.right.is_empty() {
        return Err(SearchError::TrackingLost(Side::Right));
    }

    debug!(
        left = candidates.left.len(),
        right = candidates.right.len(),
        "Localized search complete"
    );
    Ok(candidates)
}

/// Locate candidates: localized when prior fits are given, blind otherwise
pub fn locate(
    frame: &BinaryFrame,
    prior: Option<&LanePair>,
    config: &TrackerConfig,
) -> Result<LaneCandidates, SearchError> {
    match prior {
        Some(fits) => localized_search(frame, fits, config.margin),
        None => Ok(blind_search(frame, config).0),
    }
}
