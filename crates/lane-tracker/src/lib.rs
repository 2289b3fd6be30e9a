//! Lane Tracking Engine
//!
//! Estimates lane geometry from binary bird's-eye frames and tracks it
//! across a video sequence:
//! - Sliding-window histogram search (blind) and prior-fit margin search (localized)
//! - Quadratic least-squares lane fits in pixel and metric space
//! - Lane width, lateral offset and radius of curvature
//! - Per-sequence state machine with automatic fallback

pub mod config;
pub mod fitter;
pub mod geometry;
pub mod locator;
pub mod state;
pub mod tracker;

pub use config::{MetricScale, TrackerConfig};
pub use fitter::{fit_side, MetricFit, PolynomialFit, SideFit};
pub use geometry::{estimate, Curvature, LaneGeometry};
pub use locator::{blind_search, locate, localized_search, LaneCandidates, Pixel, PixelSet, Side};
pub use state::{FrameOutcome, FrameReport, LanePair, SearchMode, TrackerState};
pub use tracker::LaneTracker;

use thiserror::Error;

/// Tracker error types
///
/// Only caller-contract violations reach the caller; every per-frame
/// detection failure is recovered inside the tracker.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Frame is {actual:?} but tracker was created for {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Curve fitting errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    #[error("Insufficient points for a quadratic fit: {points} points on {distinct_rows} distinct rows")]
    InsufficientPoints { points: usize, distinct_rows: usize },
}

/// Candidate search errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    #[error("Tracking lost: no {0} lane pixels near the prior fit")]
    TrackingLost(Side),
}
