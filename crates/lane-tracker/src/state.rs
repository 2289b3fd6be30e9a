//! Tracker state and per-frame reports

use serde::{Deserialize, Serialize};

use crate::fitter::PolynomialFit;
use crate::geometry::LaneGeometry;

/// Last accepted left/right fits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanePair {
    pub left: PolynomialFit,
    pub right: PolynomialFit,
}

/// Search mode for the next frame.
///
/// `Tracking` carries the fits it trusts, so tracking without a prior is
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TrackerState {
    #[default]
    Blind,
    Tracking(LanePair),
}

impl TrackerState {
    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackerState::Tracking(_))
    }

    /// Trusted prior fits, if any
    pub fn fits(&self) -> Option<&LanePair> {
        match self {
            TrackerState::Tracking(fits) => Some(fits),
            TrackerState::Blind => None,
        }
    }
}

/// Which search produced a frame's candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Sliding-window search, no prior
    Blind,
    /// Margin search around the prior fits
    Localized,
    /// Margin search lost a line; blind search re-ran on the same frame
    Fallback,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Blind => "blind",
            SearchMode::Localized => "localized",
            SearchMode::Fallback => "fallback",
        }
    }
}

/// What the tracker published for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOutcome {
    /// New fits accepted from this frame
    Fresh,
    /// Not enough evidence; previous geometry repeated
    Held,
    /// Not enough evidence and nothing to repeat yet
    NoLane,
}

/// Result of `LaneTracker::process_frame`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub search: SearchMode,
    /// The relaxed remask replaced the first-pass candidates
    pub remasked: bool,
    pub left_points: usize,
    pub right_points: usize,
    pub outcome: FrameOutcome,
    /// Fresh geometry, or the held one; `None` only for `NoLane`
    pub geometry: Option<LaneGeometry>,
}

impl FrameReport {
    pub fn geometry(&self) -> Option<&LaneGeometry> {
        self.geometry.as_ref()
    }

    pub fn is_fresh(&self) -> bool {
        self.outcome == FrameOutcome::Fresh
    }
}
