//! Per-sequence lane tracker

use road_frame::BinaryFrame;
use tracing::{debug, info, warn};

use crate::fitter::fit_side;
use crate::geometry::{estimate, LaneGeometry};
use crate::locator::{blind_search, localized_search, LaneCandidates, Side};
use crate::state::{FrameOutcome, FrameReport, LanePair, SearchMode, TrackerState};
use crate::{TrackerConfig, TrackerError};

/// Lane tracker for one video sequence
///
/// Owns the search mode and the last accepted fits. Frames must all share
/// the dimensions given at construction.
pub struct LaneTracker {
    config: TrackerConfig,
    width: u32,
    height: u32,
    state: TrackerState,
    last_geometry: Option<LaneGeometry>,
    frames: u64,
}

impl LaneTracker {
    /// Create a tracker for `width` x `height` binary frames
    pub fn new(config: TrackerConfig, width: u32, height: u32) -> Result<Self, TrackerError> {
        config.validate()?;
        if width < 2 || height == 0 {
            return Err(TrackerError::Config(format!(
                "frame must be at least 2x1 pixels, got {}x{}",
                width, height
            )));
        }
        if config.windows > height {
            return Err(TrackerError::Config(format!(
                "{} search windows do not fit in {} rows",
                config.windows, height
            )));
        }
        info!(width, height, "Lane tracker created");
        Ok(Self {
            config,
            width,
            height,
            state: TrackerState::Blind,
            last_geometry: None,
            frames: 0,
        })
    }

    /// Process one frame without a relaxed remask source
    pub fn process_frame(&mut self, frame: &BinaryFrame) -> Result<FrameReport, TrackerError> {
        self.process_frame_with(frame, || None)
    }

    /// Process one frame.
    ///
    /// `relaxed` is called at most once, when either side comes back below
    /// its quality threshold, and should return the same image masked with
    /// looser thresholds.
    pub fn process_frame_with<F>(
        &mut self,
        frame: &BinaryFrame,
        relaxed: F,
    ) -> Result<FrameReport, TrackerError>
    where
        F: FnOnce() -> Option<BinaryFrame>,
    {
        self.check_dimensions(frame)?;

        let (mut candidates, search) = self.search(frame);
        let mut remasked = false;

        let (left, right) = candidates.counts();
        if left < self.config.quality_min_left || right < self.config.quality_min_right {
            if let Some(remask) = relaxed() {
                self.check_dimensions(&remask)?;
                candidates = self.blind(&remask);
                remasked = true;
                metrics::counter!("lane_tracker_remasks_total").increment(1);
                debug!(
                    before_left = left,
                    before_right = right,
                    left = candidates.left.len(),
                    right = candidates.right.len(),
                    "Relaxed remask searched"
                );
            }
        }

        self.frames += 1;
        metrics::counter!("lane_tracker_frames_total", "search" => search.as_str()).increment(1);

        let (left_points, right_points) = candidates.counts();
        let outcome = match self.accept(&candidates) {
            Some(geometry) => {
                self.last_geometry = Some(geometry);
                FrameOutcome::Fresh
            }
            None => self.hold(),
        };

        Ok(FrameReport {
            search,
            remasked,
            left_points,
            right_points,
            outcome,
            geometry: self.last_geometry.clone(),
        })
    }

    /// Clear fits and held geometry; the next frame is searched blind
    pub fn reset(&mut self) {
        if self.state.is_tracking() {
            info!("Lane tracker reset");
        }
        self.state = TrackerState::Blind;
        self.last_geometry = None;
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Last accepted geometry
    pub fn geometry(&self) -> Option<&LaneGeometry> {
        self.last_geometry.as_ref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Frames processed since construction
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn check_dimensions(&self, frame: &BinaryFrame) -> Result<(), TrackerError> {
        let actual = frame.dimensions();
        if actual != (self.width, self.height) {
            return Err(TrackerError::DimensionMismatch {
                expected: (self.width, self.height),
                actual,
            });
        }
        Ok(())
    }

    /// Localized search when tracking, falling back to blind on loss
    fn search(&self, frame: &BinaryFrame) -> (LaneCandidates, SearchMode) {
        match self.state.fits() {
            None => (self.blind(frame), SearchMode::Blind),
            Some(prior) => match localized_search(frame, prior, self.config.margin) {
                Ok(found) => (found, SearchMode::Localized),
                Err(e) => {
                    warn!(frame = self.frames, "{}, searching blind", e);
                    metrics::counter!("lane_tracker_fallbacks_total").increment(1);
                    (self.blind(frame), SearchMode::Fallback)
                }
            },
        }
    }

    fn blind(&self, frame: &BinaryFrame) -> LaneCandidates {
        let (candidates, trace) = blind_search(frame, &self.config);
        debug!(
            frame = self.frames,
            left_base = trace.left_base,
            right_base = trace.right_base,
            left_hits = ?trace.hits(Side::Left),
            right_hits = ?trace.hits(Side::Right),
            "Blind search windows"
        );
        candidates
    }

    /// Fit both sides and move to tracking, or `None` if the evidence is too thin
    fn accept(&mut self, candidates: &LaneCandidates) -> Option<LaneGeometry> {
        let (left, right) = candidates.counts();
        let min = self.config.fit_min_pixels;
        if left <= min || right <= min {
            debug!(left, right, min, "Fit gate rejected frame");
            return None;
        }

        let scale = &self.config.scale;
        let (left_fit, right_fit) =
            match (fit_side(&candidates.left, scale), fit_side(&candidates.right, scale)) {
                (Ok(l), Ok(r)) => (l, r),
                (Err(e), _) | (_, Err(e)) => {
                    debug!("{}", e);
                    return None;
                }
            };

        let geometry = estimate(&left_fit, &right_fit, self.height, self.width, &self.config);
        if !self.state.is_tracking() {
            info!(frame = self.frames, "Lane tracking acquired");
        }
        self.state = TrackerState::Tracking(LanePair {
            left: left_fit.pixel,
            right: right_fit.pixel,
        });
        debug!(
            width_m = geometry.lane_width_m,
            offset_m = geometry.offset_m,
            curvature = ?geometry.curvature,
            "Lane geometry updated"
        );
        Some(geometry)
    }

    /// Drop to blind search and republish the previous geometry, if any
    fn hold(&mut self) -> FrameOutcome {
        if self.state.is_tracking() {
            info!(frame = self.frames, "Lane tracking lost");
        }
        self.state = TrackerState::Blind;
        metrics::counter!("lane_tracker_held_frames_total").increment(1);
        if self.last_geometry.is_some() {
            warn!(frame = self.frames, "Holding previous lane geometry");
            FrameOutcome::Held
        } else {
            FrameOutcome::NoLane
        }
    }
}
