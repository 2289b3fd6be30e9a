//! Pipeline configuration

use std::path::{Path, PathBuf};

use lane_mask::MaskConfig;
use lane_tracker::TrackerConfig;
use road_frame::{CameraIntrinsics, PerspectiveConfig};
use serde::{Deserialize, Serialize};

use crate::overlay::OverlayConfig;
use crate::PipelineError;

/// How consecutive input images relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Unrelated stills; tracker state is reset before every image
    #[default]
    Batch,
    /// Consecutive video frames; tracker state carries over
    Sequence,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned for PNG/JPEG input images
    pub input_dir: PathBuf,

    /// Annotated images and `geometry.jsonl` are written here
    pub output_dir: PathBuf,

    pub mode: RunMode,

    /// `tracing` level name
    pub log_level: String,

    pub tracker: TrackerConfig,

    /// Primary mask thresholds
    pub mask: MaskConfig,

    /// Thresholds for the faint-marking remask; `None` disables it
    pub relaxed_mask: Option<MaskConfig>,

    /// Bird's-eye control points, given for `reference_size` frames
    pub perspective: PerspectiveConfig,

    /// Frame size the perspective points were picked on
    pub reference_size: (u32, u32),

    /// Lens model; frames are used as-is when absent
    pub camera: Option<CameraIntrinsics>,

    pub overlay: OverlayConfig,

    /// Also save the undistorted, top-down and mask images of every input
    pub debug_stages: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("test_images"),
            output_dir: PathBuf::from("output_images"),
            mode: RunMode::Batch,
            log_level: "info".to_string(),
            tracker: TrackerConfig::default(),
            mask: MaskConfig::default(),
            relaxed_mask: Some(MaskConfig::relaxed()),
            perspective: PerspectiveConfig::default(),
            reference_size: (1280, 720),
            camera: None,
            overlay: OverlayConfig::default(),
            debug_stages: false,
        }
    }
}

impl PipelineConfig {
    /// Defaults, then the optional file, then `LANE_*` environment variables
    /// (`LANE_TRACKER__MARGIN=80` sets `tracker.margin`).
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let config: Self = builder
            .add_source(
                ::config::Environment::with_prefix("LANE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.tracker.validate()?;
        self.mask.validate()?;
        if let Some(relaxed) = &self.relaxed_mask {
            relaxed.validate()?;
        }
        if let Some(camera) = &self.camera {
            camera.validate()?;
        }
        let (w, h) = self.reference_size;
        if w == 0 || h == 0 {
            return Err(PipelineError::Invalid(format!(
                "reference_size must be non-zero, got {}x{}",
                w, h
            )));
        }
        if !(0.0..=1.0).contains(&self.overlay.alpha) {
            return Err(PipelineError::Invalid(format!(
                "overlay alpha must be within [0, 1], got {}",
                self.overlay.alpha
            )));
        }
        Ok(())
    }

    /// Perspective points for a frame of the given size
    pub fn perspective_for(&self, width: u32, height: u32) -> PerspectiveConfig {
        let (rw, rh) = self.reference_size;
        if (width, height) == (rw, rh) {
            return self.perspective;
        }
        self.perspective
            .scaled(width as f32 / rw as f32, height as f32 / rh as f32)
    }
}
